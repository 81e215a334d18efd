use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_polygon_mut};
use imageproc::point::Point;
use imageproc::rect::Rect;
use line_vision::{DirectionCommand, LinePipeline, PipelineConfig, RegionMatch};

// 320x240 frame: the default 200x150 ROI spans x 60..260, y 90..240, centerline x = 160.
const WIDTH: u32 = 320;
const HEIGHT: u32 = 240;
const FLOOR: Rgb<u8> = Rgb([60, 150, 230]);
const LINE: Rgb<u8> = Rgb([15, 15, 20]);

fn blank() -> RgbImage {
    RgbImage::from_pixel(WIDTH, HEIGHT, FLOOR)
}

fn with_rect(left: i32, top: i32, width: u32, height: u32) -> RgbImage {
    let mut frame = blank();
    draw_filled_rect_mut(&mut frame, Rect::at(left, top).of_size(width, height), LINE);
    frame
}

fn tilted_strip(center: (f64, f64), angle_deg: f64, half_length: f64, half_width: f64) -> RgbImage {
    let (sin, cos) = angle_deg.to_radians().sin_cos();
    let (cx, cy) = center;
    let corner = |along: f64, across: f64| {
        Point::new(
            (cx + along * cos - across * sin).round() as i32,
            (cy + along * sin + across * cos).round() as i32,
        )
    };
    let mut frame = blank();
    draw_polygon_mut(
        &mut frame,
        &[
            corner(-half_length, -half_width),
            corner(half_length, -half_width),
            corner(half_length, half_width),
            corner(-half_length, half_width),
        ],
        LINE,
    );
    frame
}

fn pipeline() -> LinePipeline {
    LinePipeline::new(PipelineConfig::default()).expect("default config is valid")
}

#[test]
fn scenario_a_offset_vertical_line_drifts_left() {
    // Bar centered 40 px left of the ROI centerline, full frame height.
    let frame = with_rect(111, 0, 20, HEIGHT);
    let report = pipeline().process_frame(&frame);

    assert_eq!(report.region, RegionMatch::Roi);
    let error = report.lateral_error.expect("ROI error");
    assert!((-41.0..=-39.0).contains(&error), "error was {error}");
    let angle = report.orientation_deg.expect("ROI orientation");
    assert!((angle.abs() - 90.0).abs() < 2.0, "angle was {angle}");
    assert_eq!(report.raw_direction, DirectionCommand::DriftLeft);
    assert_eq!(report.direction, DirectionCommand::DriftLeft);
    assert_eq!(report.speed, 60);
}

#[test]
fn scenario_b_tilted_line_turns_right() {
    let frame = tilted_strip((160.0, 165.0), 20.0, 250.0, 15.0);
    let report = pipeline().process_frame(&frame);

    assert_eq!(report.region, RegionMatch::Roi);
    let angle = report.orientation_deg.expect("ROI orientation");
    assert!((angle - 20.0).abs() < 5.0, "angle was {angle}");
    assert!(report.lateral_error.expect("ROI error").abs() < 5.0);
    assert_eq!(report.direction, DirectionCommand::TurnRight);
}

#[test]
fn scenario_b_mirrored_tilt_turns_left() {
    let frame = tilted_strip((160.0, 165.0), -20.0, 250.0, 15.0);
    let report = pipeline().process_frame(&frame);
    assert_eq!(report.direction, DirectionCommand::TurnLeft);
}

#[test]
fn scenario_c_full_frame_fallback_drifts_right_on_approach() {
    // Blob above the ROI, centered 50 px right of the frame centerline.
    let frame = with_rect(191, 20, 40, 40);
    let report = pipeline().process_frame(&frame);

    assert_eq!(report.region, RegionMatch::FullFrame);
    let error = report.lateral_error.expect("full-frame error");
    assert!((49.0..=51.0).contains(&error), "error was {error}");
    assert!(report.orientation_deg.is_none());
    assert!(report.controller.is_none());
    assert_eq!(report.direction, DirectionCommand::DriftRightApproach);
    assert_eq!(report.miss_count, 0);
}

#[test]
fn scenario_d_ten_misses_never_start_a_search() {
    let mut pipeline = pipeline();
    for cycle in 0..10 {
        let report = pipeline.process_frame(&blank());
        assert_eq!(report.region, RegionMatch::NoMatch);
        assert_eq!(report.miss_count, cycle + 1);
        assert!(!report.searching);
        assert_eq!(report.raw_direction, DirectionCommand::NoLine);
    }

    let report = pipeline.process_frame(&with_rect(150, 0, 20, HEIGHT));
    assert_eq!(report.region, RegionMatch::Roi);
    assert_eq!(report.miss_count, 0);
    assert!(!report.searching);
}

#[test]
fn eleventh_miss_forces_search_turn_until_reacquired() {
    let mut pipeline = pipeline();
    pipeline.process_frame(&with_rect(150, 0, 20, HEIGHT));

    let mut reports = Vec::new();
    for _ in 0..13 {
        reports.push(pipeline.process_frame(&blank()));
    }

    assert!(!reports[9].searching);
    assert_eq!(reports[9].raw_direction, DirectionCommand::NoLine);
    assert!(reports[10].searching);
    assert_eq!(reports[10].raw_direction, DirectionCommand::SearchTurn);
    // The vote needs a plurality before the spin reaches the thrusters.
    assert_eq!(reports[10].direction, DirectionCommand::NoLine);
    assert_eq!(reports[12].direction, DirectionCommand::SearchTurn);
    assert_eq!(reports[12].speed, 30);

    let report = pipeline.process_frame(&with_rect(150, 0, 20, HEIGHT));
    assert_eq!(report.miss_count, 0);
    assert!(!report.searching);
    assert_eq!(report.raw_direction, DirectionCommand::Straight);
}

#[test]
fn roi_match_preempts_a_larger_full_frame_blob() {
    let mut frame = with_rect(150, 100, 20, 140);
    draw_filled_rect_mut(&mut frame, Rect::at(10, 10).of_size(80, 60), LINE);
    let report = pipeline().process_frame(&frame);
    assert_eq!(report.region, RegionMatch::Roi);
    assert_eq!(report.direction, DirectionCommand::Straight);
}

#[test]
fn speckles_inside_the_roi_are_ignored() {
    let mut frame = blank();
    for (x, y) in [(80, 120), (140, 200), (220, 160)] {
        draw_filled_rect_mut(&mut frame, Rect::at(x, y).of_size(8, 8), LINE);
    }
    let report = pipeline().process_frame(&frame);
    assert_eq!(report.region, RegionMatch::NoMatch);
    assert_eq!(report.direction, DirectionCommand::NoLine);
}

#[test]
fn flicker_is_smoothed_by_the_vote() {
    let mut pipeline = pipeline();
    let straight = with_rect(150, 0, 20, HEIGHT);
    let drifted = with_rect(220, 0, 20, HEIGHT);

    for _ in 0..4 {
        pipeline.process_frame(&straight);
    }
    let report = pipeline.process_frame(&drifted);
    assert_eq!(report.raw_direction, DirectionCommand::DriftRight);
    assert_eq!(report.direction, DirectionCommand::Straight);
}
