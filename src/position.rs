use xyzvec::XYVec;

pub type DimVec = XYVec<f64>;
pub type Position = DimVec;
pub type Velocity = DimVec;

#[inline]
pub fn dot(a: DimVec, b: DimVec) -> f64 {
    a.x() * b.x() + a.y() * b.y()
}

/// `a` scaled to unit length, or `None` if it has (numerically) no direction.
pub fn unit(a: DimVec) -> Option<DimVec> {
    let norm = a.l2_norm();
    if norm.is_normal() {
        Some(a.div_by(norm))
    } else {
        None
    }
}
