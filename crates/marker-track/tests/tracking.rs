mod common;

use approx::assert_relative_eq;
use common::{camera_params, distorted_params, render_bgr, Fixture, WIDTH};
use marker_track::core::{gray_to_packed, FrameView, GrayImage, PixelFormat, Timestamp};
use marker_track::detect::MarkerCandidate;
use marker_track::{PoseReport, TrackingSession};
use nalgebra::{Matrix3, Point2, Rotation3, Vector3};

fn ready_session(fx: &Fixture) -> TrackingSession {
    TrackingSession::from_config(&fx.config).expect("init")
}

#[test]
fn frontal_marker_pose() {
    let fx = Fixture::new();
    let mut session = ready_session(&fx);
    let pixels = render_bgr(camera_params(), |_| {});
    let frame = FrameView::new(&pixels, 320, 240, PixelFormat::Bgr).expect("frame");

    let report = session.process(&frame, Timestamp::new(10, 500)).expect("process");
    assert!(report.found);
    assert_eq!(report.timestamp, Timestamp::new(10, 500));
    assert_eq!(report.frame_index, 0);
    let pose = report.pose.expect("pose");
    assert_relative_eq!(pose.rotation, Matrix3::identity(), epsilon = 0.05);
    assert!(pose.translation.x.abs() < 2.0, "{:?}", pose.translation);
    assert!(pose.translation.y.abs() < 2.0, "{:?}", pose.translation);
    assert!((pose.translation.z - 250.0).abs() < 0.03 * 250.0, "{:?}", pose.translation);

    let m = report.in_meters().pose.expect("pose");
    assert_relative_eq!(m.translation, pose.translation * 0.001, epsilon = 1e-12);
    assert_eq!(session.latest(), report);
    assert_eq!(session.frames_processed(), 1);
}

#[test]
fn tilted_and_offset_marker_pose() {
    let fx = Fixture::new();
    let mut session = ready_session(&fx);
    let r = Rotation3::from_euler_angles(0.3, -0.2, 0.5);
    let t = Vector3::new(12.0, -8.0, 280.0);
    let pixels = render_bgr(camera_params(), |scene| {
        scene.rotation = *r.matrix();
        scene.translation = t;
    });
    let frame = FrameView::new(&pixels, 320, 240, PixelFormat::Bgr).expect("frame");

    let report = session.process(&frame, Timestamp::default()).expect("process");
    let pose = report.pose.expect("pose");
    assert!((pose.translation - t).norm() < 0.03 * t.norm(), "{:?}", pose.translation);
    let angle = Rotation3::from_matrix_unchecked(pose.rotation.transpose() * r.matrix()).angle();
    assert!(angle < 0.08, "rotation off by {angle} rad");
}

#[test]
fn frames_without_marker_change_nothing() {
    let fx = Fixture::new();
    let mut session = ready_session(&fx);
    let blank = gray_to_packed(&GrayImage::filled(320, 240, 200), PixelFormat::Bgr);
    let frame = FrameView::new(&blank, 320, 240, PixelFormat::Bgr).expect("frame");

    for i in 0..3 {
        let report = session.process(&frame, Timestamp::new(i, 0)).expect("process");
        assert!(!report.found);
        assert!(report.pose.is_none());
    }
    assert_eq!(session.frames_processed(), 3);
    assert_eq!(session.camera().map(|c| c.resize_count()), Some(0));
    assert_eq!(session.registry().len(), 1);
}

#[test]
fn camera_is_rescaled_exactly_once() {
    let fx = Fixture::with_camera(distorted_params());
    let mut session = ready_session(&fx);
    let big = render_bgr(distorted_params().resized(640, 480), |_| {});
    let frame = FrameView::new(&big, 640, 480, PixelFormat::Bgr).expect("frame");

    let first = session.process(&frame, Timestamp::default()).expect("process");
    assert!(first.found);
    let second = session.process(&frame, Timestamp::default()).expect("process");
    assert!(second.found);

    let camera = session.camera().expect("camera");
    assert_eq!(camera.resize_count(), 1);
    assert_eq!((camera.width(), camera.height()), (640, 480));
    assert_relative_eq!(camera.params().distortion.k1, -0.1);

    // the lens still bends rays after the rescale, and both paths invert it
    let p = Point2::new(100.0, 50.0);
    let observed = camera.distort_ideal(p).expect("distort");
    assert!((observed - p).norm() > 1.0, "{observed:?}");
    let back = camera.undistort_observed(observed).expect("undistort");
    assert!((back - p).norm() < 1e-6, "{back:?}");
    let via_lut = camera
        .ideal_to_observed(p)
        .and_then(|o| camera.observed_to_ideal(o))
        .expect("lut round trip");
    assert!((via_lut - p).norm() < 0.05, "{via_lut:?}");

    // a later resolution change is not followed
    let small = render_bgr(distorted_params(), |_| {});
    let frame = FrameView::new(&small, 320, 240, PixelFormat::Bgr).expect("frame");
    let third = session.process(&frame, Timestamp::default()).expect("process");
    assert!(!third.found);
    assert_eq!(session.camera().map(|c| c.resize_count()), Some(1));
}

#[test]
fn degenerate_candidate_is_recovered_on_the_next_frame() {
    let fx = Fixture::new();
    let mut session = ready_session(&fx);
    let id = session.tracked_pattern().expect("tracked");

    let p = Point2::new(160.0, 120.0);
    let collapsed = MarkerCandidate {
        pattern_id: Some(id),
        confidence: 0.9,
        direction: 0,
        corners: [p; 4],
        observed_corners: [p; 4],
        center: p,
        area: 100,
    };
    let report = session
        .process_candidates(&[collapsed], Timestamp::default())
        .expect("process");
    assert!(!report.found);

    let pixels = render_bgr(camera_params(), |_| {});
    let frame = FrameView::new(&pixels, 320, 240, PixelFormat::Bgr).expect("frame");
    let report = session.process(&frame, Timestamp::default()).expect("process");
    assert!(report.found);
    assert_eq!(report.frame_index, 1);
}

#[test]
fn repeated_frames_give_identical_poses() {
    let fx = Fixture::new();
    let mut session = ready_session(&fx);
    let pixels = render_bgr(camera_params(), |scene| {
        scene.rotation = *Rotation3::from_euler_angles(-0.2, 0.25, 0.1).matrix();
    });
    let frame = FrameView::new(&pixels, 320, 240, PixelFormat::Bgr).expect("frame");
    let ts = Timestamp::new(5, 0);

    let a = session.process(&frame, ts).expect("process");
    let b = session.process(&frame, ts).expect("process");
    assert!(a.found);
    assert_eq!(a.pose, b.pose);
    assert_eq!(b.frame_index, a.frame_index + 1);
}

#[test]
fn wrong_pixel_format_is_not_found() {
    let fx = Fixture::new();
    let mut session = ready_session(&fx);
    let gray = vec![200u8; 320 * 240];
    let frame = FrameView::new(&gray, 320, 240, PixelFormat::Gray).expect("frame");
    let report = session.process(&frame, Timestamp::default()).expect("process");
    assert!(!report.found);
    assert_eq!(session.frames_processed(), 1);
}

#[test]
fn reports_reach_sinks_and_readers() {
    let fx = Fixture::new();
    let mut session = ready_session(&fx);
    let reader = session.pose_reader();
    let pixels = render_bgr(camera_params(), |_| {});
    let frame = FrameView::new(&pixels, 320, 240, PixelFormat::Bgr).expect("frame");

    let mut published: Vec<PoseReport> = Vec::new();
    let mut sink = |r: &PoseReport| published.push(*r);
    for i in 0..2 {
        session
            .process_and_publish(&frame, Timestamp::new(i, 0), &mut sink)
            .expect("process");
    }
    assert_eq!(published.len(), 2);
    assert!(published.iter().all(|r| r.found));

    let snapshot = std::thread::spawn(move || reader.latest())
        .join()
        .expect("reader thread");
    assert_eq!(snapshot, published[1]);
}

#[test]
fn marker_width_scales_the_distance() {
    let fx = Fixture::new();
    let mut config = fx.config.clone();
    config.pattern_width = WIDTH / 2.0;
    let pixels = render_bgr(camera_params(), |_| {});
    let frame = FrameView::new(&pixels, 320, 240, PixelFormat::Bgr).expect("frame");

    let mut full = ready_session(&fx);
    let mut half = TrackingSession::from_config(&config).expect("init");
    let a = full.process(&frame, Timestamp::default()).expect("process");
    let b = half.process(&frame, Timestamp::default()).expect("process");
    let (a, b) = (a.pose.expect("pose"), b.pose.expect("pose"));
    assert_relative_eq!(b.translation, a.translation * 0.5, epsilon = 1e-3);
}
