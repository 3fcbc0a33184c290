// Web-specific entry point and initialization
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use glam::Vec2;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use winit::event_loop::{ControlFlow, EventLoop};
use winit::platform::web::EventLoopExtWebSys;

use crate::{render::RenderApp, Config, Error};

/// Id of the canvas the gallery renders into
pub(crate) const CANVAS_ID: &str = "gallery-canvas";

// Flag to signal a recenter from JavaScript
static RECENTER_REQUESTED: AtomicBool = AtomicBool::new(false);

// Camera position exposed to JavaScript, stored as f32 bits
static CAMERA_X: AtomicU32 = AtomicU32::new(0);
static CAMERA_Y: AtomicU32 = AtomicU32::new(0);

pub(crate) fn take_recenter_request() -> bool {
    RECENTER_REQUESTED.swap(false, Ordering::SeqCst)
}

pub(crate) fn publish_camera(position: Vec2) {
    CAMERA_X.store(position.x.to_bits(), Ordering::Relaxed);
    CAMERA_Y.store(position.y.to_bits(), Ordering::Relaxed);
}

/// The page's gallery canvas, if it has one
pub(crate) fn gallery_canvas() -> Option<web_sys::HtmlCanvasElement> {
    web_sys::window()?
        .document()?
        .get_element_by_id(CANVAS_ID)?
        .dyn_into::<web_sys::HtmlCanvasElement>()
        .ok()
}

pub(crate) fn prefers_reduced_motion() -> bool {
    web_sys::window()
        .and_then(|window| window.match_media("(prefers-reduced-motion: reduce)").ok().flatten())
        .is_some_and(|query| query.matches())
}

/// Request a recenter (called from JavaScript)
#[wasm_bindgen]
pub fn recenter() {
    RECENTER_REQUESTED.store(true, Ordering::SeqCst);
}

/// Current camera x offset (called from JavaScript)
#[wasm_bindgen]
pub fn camera_x() -> f32 {
    f32::from_bits(CAMERA_X.load(Ordering::Relaxed))
}

/// Current camera y offset (called from JavaScript)
#[wasm_bindgen]
pub fn camera_y() -> f32 {
    f32::from_bits(CAMERA_Y.load(Ordering::Relaxed))
}

/// Initialize the web application with default settings
#[wasm_bindgen]
pub async fn start() -> Result<(), JsValue> {
    let config = Config::default();
    start_with_params(config.layout.item_count, config.animations, config.motion.wheel_enabled).await
}

/// Start the gallery with specific parameters
/// Called from JavaScript with values from the page
#[wasm_bindgen]
pub async fn start_with_params(
    item_count: u32,
    animations: bool,
    wheel_enabled: bool,
) -> Result<(), JsValue> {
    // Set up panic hook and logger only once (ignore errors if already initialized)
    use std::sync::Once;
    static INIT: Once = Once::new();

    INIT.call_once(|| {
        std::panic::set_hook(Box::new(console_error_panic_hook::hook));
        let _ = console_log::init_with_level(log::Level::Info);
    });

    log::info!(
        "Starting gallery with {} images, animations={}, wheel={}",
        item_count,
        animations,
        wheel_enabled
    );

    publish_camera(Vec2::ZERO);
    RECENTER_REQUESTED.store(false, Ordering::SeqCst);

    let mut config = Config::default();
    config.layout.item_count = item_count;
    config.animations = animations;
    config.motion.wheel_enabled = wheel_enabled;

    // Validate configuration - a safety layer in case JavaScript passes nonsense
    if let Err(errors) = config.validate() {
        let error = Error::InvalidConfig(errors);
        log::error!("{}", error);
        return Err(JsValue::from_str(&error.to_string()));
    }

    let event_loop = EventLoop::new().map_err(|e| JsValue::from_str(&Error::from(e).to_string()))?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let app = RenderApp::new(&event_loop, config)
        .await
        .map_err(|e| JsValue::from_str(&e.to_string()))?;

    // Hands control to the browser; returns immediately
    event_loop.spawn_app(app);

    Ok(())
}
