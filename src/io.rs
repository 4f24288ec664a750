use std::{
    f32::consts::PI,
    fs::{self, File},
    io::{BufWriter, Write},
};

use raqote::*;

use crate::{
    cli::SnookerConfig,
    container::Container,
    event::EventRecord,
    observables::{maxwell_boltzmann_2d, Sample, SpeedHistogram},
    simulation::{Simulation, Snapshot},
};

pub struct XYZWriter {
    file: BufWriter<File>,
}

impl XYZWriter {
    pub fn new(p: &str) -> anyhow::Result<Self> {
        let file = BufWriter::new(File::create(p)?);
        Ok(Self { file })
    }

    pub fn write_xyz_frame(&mut self, snapshot: &Snapshot) -> anyhow::Result<()> {
        writeln!(self.file, "{}", snapshot.entries.len())?;
        writeln!(
            self.file,
            "tick = {} t = {:?}",
            snapshot.tick, snapshot.elapsed_time
        )?;
        for e in snapshot.entries.iter() {
            writeln!(
                self.file,
                "p{} {:?} {:?} 0",
                e.id, e.position[0], e.position[1]
            )?;
        }
        Ok(())
    }

    pub fn flush(&mut self) -> anyhow::Result<()> {
        self.file.flush()?;
        Ok(())
    }
}

/// One JSON object per line, one line per resolved contact.
pub struct EventLogWriter {
    file: BufWriter<File>,
}

impl EventLogWriter {
    pub fn new(p: &str) -> anyhow::Result<Self> {
        let file = BufWriter::new(File::create(p)?);
        Ok(Self { file })
    }

    pub fn write_records(&mut self, records: &[EventRecord]) -> anyhow::Result<()> {
        for rec in records {
            serde_json::to_writer(&mut self.file, rec)?;
            writeln!(self.file)?;
        }
        Ok(())
    }

    pub fn flush(&mut self) -> anyhow::Result<()> {
        self.file.flush()?;
        Ok(())
    }
}

/// VMD script: sizes the atoms and draws the container as a 64-gon.
pub fn write_tcl(container: &Container, ball_radius: f64, p: &str) -> anyhow::Result<()> {
    let mut file = File::create(p)?;
    write!(
        file,
        "light 0 on
    light 1 on
    light 2 off
    light 3 off
    axes location off
    stage location off
    display projection orthographic
    mol modstyle 0 0 VDW 1 30
    set sel [atomselect top \"all\"]
    $sel set radius {:?}
    color Name P blue
    display depthcue off
    draw materials off
    draw color white
",
        ball_radius
    )?;
    let segments = 64;
    let rc = container.radius();
    for k in 0..segments {
        let a0 = 2.0 * std::f64::consts::PI * k as f64 / segments as f64;
        let a1 = 2.0 * std::f64::consts::PI * (k + 1) as f64 / segments as f64;
        writeln!(
            file,
            "    draw line \"{:?} {:?} 0\" \"{:?} {:?} 0\"",
            rc * a0.cos(),
            rc * a0.sin(),
            rc * a1.cos(),
            rc * a1.sin()
        )?;
    }
    Ok(())
}

fn rgba_solid(r: u8, g: u8, b: u8, a: u8) -> Source<'static> {
    Source::Solid(SolidSource { r, g, b, a })
}

fn rgba_white() -> Source<'static> {
    rgba_solid(0xff, 0xff, 0xff, 0xff)
}

fn rgba_black() -> Source<'static> {
    rgba_solid(0, 0, 0, 0xff)
}

fn rgba_orange() -> Source<'static> {
    rgba_solid(0xf3, 0x70, 0x21, 0xff)
}

fn draw_white_background(dt: &mut DrawTarget, side: f32) {
    let mut pb = PathBuilder::new();
    pb.rect(0.0, 0.0, side, side);
    let draw_path = pb.finish();
    dt.fill(&draw_path, &rgba_white(), &DrawOptions::new());
}

fn render_circle_at(x: f32, y: f32, radius: f32) -> Path {
    let mut pb = PathBuilder::new();
    pb.arc(x, y, radius, 0.0, 2.0 * PI);
    pb.close();
    pb.finish()
}

// image coordinates: origin top-left, y down
fn to_px(x: f64, y: f64, rc: f64, scale: f64) -> (f32, f32) {
    (((x + rc) * scale) as f32, ((rc - y) * scale) as f32)
}

fn render_container(sim: &Simulation, dt: &mut DrawTarget, scale: f64) {
    let rc = sim.container().radius();
    let (cx, cy) = to_px(0.0, 0.0, rc, scale);
    let mut style = StrokeStyle::default();
    style.width = 3.0;
    let path = render_circle_at(cx, cy, (rc * scale) as f32);
    dt.stroke(&path, &rgba_black(), &style, &DrawOptions::new());
}

fn render_particles(sim: &Simulation, dt: &mut DrawTarget, scale: f64) {
    let rc = sim.container().radius();
    let source = rgba_black();
    let style = StrokeStyle::default();
    let draw_options = DrawOptions::new();

    for p in sim.particles().iter() {
        let (x, y) = to_px(p.pos().x(), p.pos().y(), rc, scale);
        let draw_path = render_circle_at(x, y, (p.radius() * scale) as f32);
        dt.stroke(&draw_path, &source, &style, &draw_options);
    }
}

// velocity arrows, length = distance covered in `arrow_time`
fn render_velocities(sim: &Simulation, dt: &mut DrawTarget, scale: f64, arrow_time: f64) {
    let rc = sim.container().radius();
    let source = rgba_orange();
    let mut style = StrokeStyle::default();
    style.width = 2.0;
    let draw_options = DrawOptions::new();

    for p in sim.particles().iter() {
        let tip = p.pos() + p.vel().scale_by(arrow_time);
        let (x0, y0) = to_px(p.pos().x(), p.pos().y(), rc, scale);
        let (x1, y1) = to_px(tip.x(), tip.y(), rc, scale);
        let mut pb = PathBuilder::new();
        pb.move_to(x0, y0);
        pb.line_to(x1, y1);
        let draw_path = pb.finish();
        dt.stroke(&draw_path, &source, &style, &draw_options);
    }
}

pub fn write_geometry_png(sim: &Simulation, pathname: &str) -> anyhow::Result<()> {
    let rc = sim.container().radius();
    // ~800 px across whatever the container size
    let scale = 400.0 / rc;
    let side = (2.0 * rc * scale).ceil() as i32;
    let mut dt = DrawTarget::new(side, side);

    let max_speed = sim.particles().iter().map(|p| p.speed()).fold(0.0, f64::max);
    let arrow_time = if max_speed > 0.0 { 0.2 * rc / max_speed } else { 0.0 };

    draw_white_background(&mut dt, side as f32);
    render_container(sim, &mut dt, scale);
    render_particles(sim, &mut dt, scale);
    render_velocities(sim, &mut dt, scale, arrow_time);

    dt.write_png(pathname)?;
    Ok(())
}

fn upper_bound(xs: impl Iterator<Item = f64>) -> f64 {
    let m = xs.fold(0.0, f64::max);
    if m > 0.0 {
        1.2 * m
    } else {
        1.0
    }
}

/// Kinetic energy (top) and pressure (bottom) against simulation time.
pub fn write_observables_png(samples: &[Sample], pathname: &str) -> anyhow::Result<()> {
    use plotters::prelude::*;

    let t_max = upper_bound(samples.iter().map(|s| s.time));
    let ke_max = upper_bound(samples.iter().map(|s| s.kinetic_energy));
    let p_max = upper_bound(samples.iter().map(|s| s.pressure));

    let root_area = BitMapBackend::new(pathname, (1000, 800)).into_drawing_area();
    root_area.fill(&WHITE)?;
    let (top, bot) = root_area.split_vertically(400);

    let mut top_ctx = ChartBuilder::on(&top)
        .set_label_area_size(LabelAreaPosition::Left, 48)
        .set_label_area_size(LabelAreaPosition::Bottom, 32)
        .caption("Kinetic Energy", ("sans-serif", 32))
        .build_cartesian_2d(0.0..t_max, 0.0..ke_max)?;

    let mut bot_ctx = ChartBuilder::on(&bot)
        .set_label_area_size(LabelAreaPosition::Left, 48)
        .set_label_area_size(LabelAreaPosition::Bottom, 32)
        .caption("Pressure", ("sans-serif", 32))
        .build_cartesian_2d(0.0..t_max, 0.0..p_max)?;

    top_ctx.configure_mesh().draw()?;
    bot_ctx.configure_mesh().draw()?;

    let line_style = RGBColor(0xf3, 0x70, 0x21).stroke_width(2);
    top_ctx.draw_series(LineSeries::new(
        samples.iter().map(|s| (s.time, s.kinetic_energy)),
        line_style,
    ))?;
    bot_ctx.draw_series(LineSeries::new(
        samples.iter().map(|s| (s.time, s.pressure)),
        line_style,
    ))?;

    root_area.present()?;
    Ok(())
}

/// Speed histogram (as a density) with the Maxwell-Boltzmann curve for `kt` on top.
pub fn write_speeds_png(
    hist: &SpeedHistogram,
    mass: f64,
    kt: f64,
    pathname: &str,
) -> anyhow::Result<()> {
    use plotters::prelude::*;

    let density = hist.density();
    let v_max = hist.bin_width() * density.len() as f64;
    let curve: Vec<(f64, f64)> = (0..=200)
        .map(|k| {
            let v = v_max * k as f64 / 200.0;
            (v, maxwell_boltzmann_2d(v, mass, kt))
        })
        .collect();
    let y_max = upper_bound(density.iter().copied().chain(curve.iter().map(|&(_, f)| f)));

    let root_area = BitMapBackend::new(pathname, (1000, 600)).into_drawing_area();
    root_area.fill(&WHITE)?;

    let mut ctx = ChartBuilder::on(&root_area)
        .set_label_area_size(LabelAreaPosition::Left, 48)
        .set_label_area_size(LabelAreaPosition::Bottom, 32)
        .caption("Speed Distribution", ("sans-serif", 32))
        .build_cartesian_2d(0.0..v_max, 0.0..y_max)?;
    ctx.configure_mesh().draw()?;

    let w = hist.bin_width();
    ctx.draw_series(density.iter().enumerate().map(|(i, &d)| {
        let x0 = i as f64 * w;
        Rectangle::new([(x0, 0.0), (x0 + w, d)], BLUE.mix(0.4).filled())
    }))?;
    ctx.draw_series(LineSeries::new(
        curve,
        RGBColor(0xf3, 0x70, 0x21).stroke_width(2),
    ))?;

    root_area.present()?;
    Ok(())
}

fn try_delete(p: String) -> anyhow::Result<()> {
    if std::path::Path::new(&p).is_file() {
        fs::remove_file(p)?;
    }
    Ok(())
}

pub fn clear_out_files(config: &SnookerConfig) -> anyhow::Result<()> {
    try_delete(config.toml())?;
    try_delete(config.vmd())?;
    try_delete(config.geometry())?;
    try_delete(config.trajectory())?;
    try_delete(config.observables_plot())?;
    try_delete(config.speeds_plot())?;
    Ok(())
}
