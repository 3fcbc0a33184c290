use clap::Parser;
use winit::event_loop::{ControlFlow, EventLoop};

use infinigridlib::{constants, render::RenderApp, Config, Error};

#[derive(Parser, Debug)]
#[command(name = "infinigrid")]
#[command(about = "Infinite, virtualized image gallery canvas", long_about = None)]
struct Args {
    /// Window width in pixels
    #[arg(long, default_value_t = constants::DEFAULT_WIDTH)]
    width: u32,

    /// Window height in pixels
    #[arg(long, default_value_t = constants::DEFAULT_HEIGHT)]
    height: u32,

    /// Start in fullscreen mode
    #[arg(short, long)]
    fullscreen: bool,

    /// Disable all animations
    #[arg(long)]
    no_animations: bool,

    /// Disable wheel panning
    #[arg(long)]
    no_wheel: bool,

    /// Number of distinct images
    #[arg(short = 'n', long, default_value_t = constants::DEFAULT_ITEM_COUNT)]
    item_count: u32,

    /// Row stride of the image assignment
    #[arg(short, long, default_value_t = constants::DEFAULT_COLUMNS)]
    columns: i32,

    /// Directory holding 1.jpg ..= N.jpg
    #[arg(long, default_value = constants::DEFAULT_IMAGE_DIR)]
    image_dir: String,

    /// Extra viewport fraction kept materialized around the screen
    #[arg(long)]
    buffer: Option<f32>,

    /// Wheel scroll speed multiplier
    #[arg(long)]
    scroll_speed: Option<f32>,

    /// Navigation label revealed at startup (empty for none)
    #[arg(long, default_value = constants::DEFAULT_NAV_LABEL)]
    nav_label: String,
}

impl Args {
    fn into_config(self) -> Config {
        let mut config = Config {
            width: self.width,
            height: self.height,
            fullscreen: self.fullscreen,
            animations: !self.no_animations,
            nav_label: self.nav_label,
            ..Config::default()
        };
        config.layout.item_count = self.item_count;
        config.layout.columns = self.columns;
        config.layout.image_dir = self.image_dir;
        config.motion.wheel_enabled = !self.no_wheel;
        if let Some(buffer) = self.buffer {
            config.virtualizer.buffer_factor = buffer;
        }
        if let Some(speed) = self.scroll_speed {
            config.motion.scroll_speed = speed;
        }
        config
    }
}

fn main() {
    env_logger::init();
    let config = Args::parse().into_config();

    if let Err(e) = pollster::block_on(run(config)) {
        log::error!("{}", e);
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run(config: Config) -> Result<(), Error> {
    config.validate().map_err(Error::InvalidConfig)?;

    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = RenderApp::new(&event_loop, config).await?;
    event_loop.run_app(&mut app)?;
    Ok(())
}
