//! Property-based invariant tests for virtualization and the scene.
//!
//! Verifies:
//! 1. After a refresh the materialized set is exactly the window of the camera
//! 2. A second refresh with the same camera creates and releases nothing
//! 3. The presenter never holds more tiles than the virtualizer tracks
//! 4. Image indices are deterministic and always within 1..=item_count
//! 5. Image sources parse back to the index they were built from
//! 6. A pinned tile survives arbitrary camera travel
//! 7. Scene: the expanded tile stays materialized while the expansion is active
//! 8. Scene: once input settles, the materialized set matches the window again

use infinigridlib::board::TileBoard;
use infinigridlib::grid::{parse_image_index, CellAddress, GridLayout, Vec2};
use infinigridlib::motion::Camera;
use infinigridlib::scene::Scene;
use infinigridlib::strategy::Immediate;
use infinigridlib::virtualizer::{Virtualizer, VirtualizerConfig};
use infinigridlib::Config;
use proptest::prelude::*;

const VIEWPORT: Vec2 = Vec2::new(1024.0, 768.0);

// ── Strategy helpers ──────────────────────────────────────────────────

fn arb_vec(range: f32) -> impl Strategy<Value = Vec2> {
    (-range..range, -range..range).prop_map(|(x, y)| Vec2::new(x, y))
}

fn arb_camera() -> impl Strategy<Value = Camera> {
    (arb_vec(20_000.0), arb_vec(300.0)).prop_map(|(current, travel)| Camera {
        current,
        target: current + travel,
    })
}

fn arb_viewport() -> impl Strategy<Value = Vec2> {
    (320.0f32..2560.0, 240.0f32..1600.0).prop_map(|(w, h)| Vec2::new(w, h))
}

fn arb_layout() -> impl Strategy<Value = GridLayout> {
    (80.0f32..400.0, 80.0f32..400.0, 20.0f32..300.0, 1i32..12, 1u32..60).prop_map(
        |(tile_width, tile_height, gap, columns, item_count)| GridLayout {
            tile_width,
            tile_height,
            gap,
            columns,
            item_count,
            ..GridLayout::default()
        },
    )
}

#[derive(Debug, Clone)]
enum Input {
    Move(Vec2),
    Down(Vec2),
    Up(Vec2),
    Wheel(Vec2),
    Frame(f64),
    Escape,
    Resize(Vec2),
}

fn arb_screen_point() -> impl Strategy<Value = Vec2> {
    (0.0f32..1024.0, 0.0f32..768.0).prop_map(|(x, y)| Vec2::new(x, y))
}

fn arb_input() -> impl Strategy<Value = Input> {
    prop_oneof![
        3 => arb_screen_point().prop_map(Input::Move),
        2 => arb_screen_point().prop_map(Input::Down),
        2 => arb_screen_point().prop_map(Input::Up),
        1 => arb_vec(400.0).prop_map(Input::Wheel),
        4 => (1.0f64..120.0).prop_map(Input::Frame),
        1 => Just(Input::Escape),
        1 => arb_viewport().prop_map(Input::Resize),
    ]
}

fn virtualizer(layout: GridLayout) -> Virtualizer<infinigridlib::board::TileId> {
    Virtualizer::new(VirtualizerConfig::default(), layout)
}

// ── Virtualizer ───────────────────────────────────────────────────────

proptest! {
    #[test]
    fn refresh_materializes_exactly_the_window(
        layout in arb_layout(),
        cameras in prop::collection::vec(arb_camera(), 1..6),
        viewport in arb_viewport(),
    ) {
        let mut virtualizer = virtualizer(layout);
        let mut board = TileBoard::new();
        for (step, camera) in cameras.iter().enumerate() {
            virtualizer.refresh(camera, viewport, &mut board, &Immediate, step as f64 * 16.0);

            let expected: Vec<CellAddress> = virtualizer.window(camera, viewport).iter().collect();
            prop_assert_eq!(virtualizer.addresses(), expected);
            prop_assert_eq!(board.len(), virtualizer.len());
        }
    }

    #[test]
    fn second_refresh_is_a_no_op(
        camera in arb_camera(),
        viewport in arb_viewport(),
    ) {
        let mut virtualizer = virtualizer(GridLayout::default());
        let mut board = TileBoard::new();
        virtualizer.refresh(&camera, viewport, &mut board, &Immediate, 0.0);
        let report = virtualizer.refresh(&camera, viewport, &mut board, &Immediate, 1.0);
        prop_assert!(report.is_empty());
    }

    #[test]
    fn pinned_tile_survives_travel(
        cameras in prop::collection::vec(arb_camera(), 1..8),
    ) {
        let mut virtualizer = virtualizer(GridLayout::default());
        let mut board = TileBoard::new();
        virtualizer.refresh(&Camera::default(), VIEWPORT, &mut board, &Immediate, 0.0);

        let pinned = CellAddress::new(0, 0);
        virtualizer.pin(pinned);
        for camera in &cameras {
            let report = virtualizer.refresh(camera, VIEWPORT, &mut board, &Immediate, 0.0);
            prop_assert!(virtualizer.contains(pinned));
            prop_assert!(!report.released.contains(&pinned));
            prop_assert!(!report.created.contains(&pinned));
        }
    }
}

// ── Grid assignment ───────────────────────────────────────────────────

proptest! {
    #[test]
    fn image_index_is_stable_and_in_range(
        layout in arb_layout(),
        col in any::<i32>(),
        row in any::<i32>(),
    ) {
        let address = CellAddress::new(col, row);
        let index = layout.image_index(address);
        prop_assert!(index >= 1 && index <= layout.item_count);
        prop_assert_eq!(index, layout.image_index(address));
    }

    #[test]
    fn image_source_parses_back(index in 1u32..10_000) {
        let layout = GridLayout::default();
        prop_assert_eq!(parse_image_index(&layout.image_source(index)), index);
    }
}

// ── Scene ─────────────────────────────────────────────────────────────

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn scene_keeps_invariants_under_random_input(
        inputs in prop::collection::vec(arb_input(), 1..60),
    ) {
        let mut scene = Scene::new(
            &Config::default(),
            Box::new(Immediate),
            TileBoard::new(),
            VIEWPORT,
            0.0,
        );
        let mut now = 0.0;

        for input in inputs {
            now += 1.0;
            match input {
                Input::Move(p) => scene.pointer_move(p, now),
                Input::Down(p) => scene.pointer_down(p, now),
                Input::Up(p) => {
                    scene.pointer_up(p, now);
                }
                Input::Wheel(d) => {
                    scene.wheel(d);
                }
                Input::Frame(dt) => {
                    now += dt;
                    scene.frame(now);
                }
                Input::Escape => {
                    scene.dismiss(now);
                }
                Input::Resize(viewport) => scene.resize(viewport, now),
            }

            if let Some(address) = scene.expansion().address() {
                prop_assert!(scene.virtualizer().contains(address));
                prop_assert_eq!(scene.virtualizer().pinned(), Some(address));
                prop_assert!(scene.motion().is_locked());
            }
            prop_assert_eq!(scene.presenter().len(), scene.virtualizer().len());
        }

        // Collapse anything still open, then let the throttle catch up
        scene.pointer_up(Vec2::new(-100.0, -100.0), now);
        scene.dismiss(now);
        for _ in 0..4 {
            now += 16.0;
            scene.frame(now);
        }
        prop_assert!(!scene.expansion().is_active());
        prop_assert!(!scene.motion().is_locked());

        now += 1_000.0;
        scene.frame(now);
        let camera = *scene.motion().camera();
        let expected: Vec<CellAddress> = scene
            .virtualizer()
            .window(&camera, scene.viewport())
            .iter()
            .collect();
        prop_assert_eq!(scene.virtualizer().addresses(), expected);
    }
}
