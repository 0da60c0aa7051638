use chunky_image::operation::{EllipseOperation, RectangleOperation};
use chunky_image::{AffectedArea, BlendMode, Chunk, ChunkCoordinate, ChunkyImage, ChunkyImageError, Color, IRect, Paint, Resolution, Surface};
use glam::{IVec2, UVec2};
use pretty_assertions::assert_eq;

fn init_logger() {
	let _ = env_logger::builder().is_test(true).try_init();
}

fn region(image: &ChunkyImage, rect: IRect, resolution: Resolution, latest: bool) -> Surface {
	let size = (rect.size().as_uvec2() + resolution.divisor() - 1) / resolution.divisor();
	let mut surface = Surface::new(size.x, size.y);
	let result = if latest {
		image.draw_most_up_to_date_region_on(rect, resolution, &mut surface, IVec2::ZERO)
	} else {
		image.draw_committed_region_on(rect, resolution, &mut surface, IVec2::ZERO)
	};
	assert_eq!(result, Ok(()));
	surface
}

#[test]
fn flood_fill_previews_then_commits_to_every_resolution() {
	init_logger();
	let mut image = ChunkyImage::new(UVec2::splat(256));
	let rect = IRect::from_size(UVec2::splat(256));

	image.enqueue_flood_fill(IVec2::new(100, 100), Color::RED, 0.);
	assert_eq!(image.pending_operation_count(), 1);

	let preview = region(&image, rect, Resolution::Full, true);
	assert!(preview.data().iter().all(|&pixel| pixel == Color::RED));
	let committed = region(&image, rect, Resolution::Full, false);
	assert!(committed.is_fully_transparent());

	let affected = image.commit();
	assert_eq!(affected.sorted_chunks(), vec![ChunkCoordinate::new(0, 0)]);
	assert_eq!(image.commit_counter(), 1);

	let half = image.reader().unwrap().committed_chunk(ChunkCoordinate::new(0, 0), Resolution::Half).unwrap().unwrap();
	assert_eq!(half.pixel_size(), 128);
	assert_eq!(*half, Chunk::filled(Resolution::Half, Color::RED));
}

#[test]
fn lower_resolutions_match_successive_downsampling() {
	init_logger();
	let mut image = ChunkyImage::new(UVec2::splat(512));
	image.enqueue(EllipseOperation::filled(IRect::from_corners(IVec2::new(13, 40), IVec2::new(471, 300)), Paint::new(Color::BLUE)).with_stroke(Paint::new(Color::GREEN), 7.));
	image.enqueue_stroke(vec![glam::DVec2::new(3., 3.), glam::DVec2::new(500., 200.)], 5., Paint::new(Color::from_rgbaf32(1., 0.5, 0., 0.5).unwrap()));
	image.commit();

	let reader = image.reader().unwrap();
	for coordinate in image.find_committed_chunks() {
		let full = reader.committed_chunk(coordinate, Resolution::Full).unwrap().unwrap();
		let mut expected = (*full).clone();
		for resolution in [Resolution::Half, Resolution::Quarter, Resolution::Eighth] {
			expected = expected.downsample().unwrap();
			let actual = reader.committed_chunk(coordinate, resolution).unwrap().unwrap();
			assert_eq!(*actual, expected, "{coordinate} at {resolution}");
		}
	}
}

#[test]
fn lower_resolution_previews_match_the_committed_mirrors() {
	init_logger();
	let mut image = ChunkyImage::new(UVec2::splat(512));
	image.enqueue_rectangle(IRect::from_corners(IVec2::new(0, 0), IVec2::new(300, 40)), Paint::new(Color::GREEN));
	image.commit();

	let half_transparent_orange = Paint::new(Color::from_rgbaf32(1., 0.5, 0., 0.5).unwrap());
	image.enqueue_pixels(vec![IVec2::new(1, 1), IVec2::new(259, 3), IVec2::new(300, 301)], Paint::new(Color::RED));
	image.enqueue_stroke(vec![glam::DVec2::new(5., 70.), glam::DVec2::new(480., 90.), glam::DVec2::new(400., 500.)], 1., half_transparent_orange);
	image.enqueue_flood_fill(IVec2::new(10, 10), Color::BLUE, 0.);
	image.set_lock_transparency(true);
	image.enqueue_rectangle(IRect::from_corners(IVec2::new(100, 0), IVec2::new(400, 120)), Paint::new(Color::WHITE));

	let resolutions = [Resolution::Half, Resolution::Quarter, Resolution::Eighth];
	let coordinates = image.find_all_chunks();
	let read = |chunk: Option<std::sync::Arc<Chunk>>, resolution| chunk.map_or_else(|| Chunk::transparent(resolution), |chunk| (*chunk).clone());

	let reader = image.reader().unwrap();
	let mut previews = Vec::new();
	for &coordinate in &coordinates {
		for resolution in resolutions {
			previews.push((coordinate, resolution, read(reader.most_up_to_date_chunk(coordinate, resolution).unwrap(), resolution)));
		}
	}
	drop(reader);

	image.commit();
	let reader = image.reader().unwrap();
	for (coordinate, resolution, preview) in previews {
		let committed = read(reader.committed_chunk(coordinate, resolution).unwrap(), resolution);
		assert_eq!(committed, preview, "{coordinate} at {resolution}");
	}
}

#[test]
fn committing_an_empty_queue_changes_nothing() {
	init_logger();
	let mut image = ChunkyImage::new(UVec2::splat(300));
	image.enqueue_rectangle(IRect::from_corners(IVec2::ZERO, IVec2::splat(280)), Paint::new(Color::RED));
	assert!(!image.commit().is_empty());

	let chunks = image.find_committed_chunks();
	let snapshot = image.committed_snapshot();
	let counter = image.commit_counter();

	assert_eq!(image.commit(), AffectedArea::new());
	assert_eq!(image.commit_counter(), counter);
	assert_eq!(image.find_committed_chunks(), chunks);
	assert!(AffectedArea::diff(&Default::default(), &Default::default()).is_empty());
	assert_eq!(image.committed_snapshot().chunk_count(), snapshot.chunk_count());
}

#[test]
fn overlapping_fills_keep_the_last_color() {
	init_logger();
	let mut image = ChunkyImage::new(UVec2::splat(64));
	let rect = IRect::from_size(UVec2::splat(64));
	image.enqueue(RectangleOperation::new(rect, Paint::new(Color::RED)));
	image.enqueue(RectangleOperation::new(rect, Paint::new(Color::BLUE)));
	image.commit();
	assert_eq!(image.get_committed_pixel(IVec2::new(31, 31)), Color::BLUE);

	image.enqueue(RectangleOperation::new(rect, Paint::new(Color::BLUE)));
	image.enqueue(RectangleOperation::new(rect, Paint::new(Color::RED)));
	image.commit();
	assert_eq!(image.get_committed_pixel(IVec2::new(31, 31)), Color::RED);
}

#[test]
fn cancelling_restores_previous_reads() {
	init_logger();
	let mut image = ChunkyImage::new(UVec2::splat(600));
	image.enqueue_rectangle(IRect::from_corners(IVec2::new(10, 10), IVec2::new(100, 100)), Paint::new(Color::GREEN));
	image.commit();

	let rect = IRect::from_size(UVec2::splat(600));
	let before = region(&image, rect, Resolution::Quarter, true);

	image.enqueue_clear();
	image.enqueue_image(Surface::filled(300, 300, Color::WHITE), IVec2::new(250, 250), BlendMode::Multiply);
	image.enqueue_resize(UVec2::splat(50));
	assert_ne!(region(&image, rect, Resolution::Quarter, true), before);

	let affected = image.cancel_changes();
	assert!(affected.contains(ChunkCoordinate::new(0, 0)));
	assert!(affected.contains(ChunkCoordinate::new(1, 1)));
	assert_eq!(image.latest_size(), UVec2::splat(600));
	assert_eq!(image.pending_operation_count(), 0);
	assert_eq!(region(&image, rect, Resolution::Quarter, true), before);
}

#[test]
fn invalid_operations_are_not_queued() {
	init_logger();
	let mut image = ChunkyImage::new(UVec2::splat(64));
	image.enqueue_rectangle(IRect::from_corners(IVec2::new(5, 5), IVec2::new(5, 30)), Paint::new(Color::RED));
	image.enqueue_stroke(vec![glam::DVec2::new(f64::NAN, 3.)], 4., Paint::new(Color::RED));
	image.enqueue_stroke(vec![glam::DVec2::new(3., 3.)], -1., Paint::new(Color::RED));
	image.enqueue_rectangle(IRect::from_corners(IVec2::new(100, 100), IVec2::new(120, 120)), Paint::new(Color::RED));
	image.enqueue_pixels(Vec::new(), Paint::new(Color::RED));
	assert_eq!(image.pending_operation_count(), 0);
	assert!(image.find_affected_area().is_empty());
}

#[test]
fn affected_area_is_tracked_per_operation() {
	init_logger();
	let mut image = ChunkyImage::new(UVec2::splat(1024));
	image.enqueue_rectangle(IRect::from_corners(IVec2::ZERO, IVec2::splat(10)), Paint::new(Color::RED));
	image.enqueue_rectangle(IRect::from_corners(IVec2::new(600, 600), IVec2::splat(610)), Paint::new(Color::RED));

	assert_eq!(image.find_affected_area().sorted_chunks(), vec![ChunkCoordinate::new(0, 0), ChunkCoordinate::new(2, 2)]);
	assert_eq!(image.find_affected_area_from(1).sorted_chunks(), vec![ChunkCoordinate::new(2, 2)]);
	assert!(image.latest_or_committed_chunk_exists(ChunkCoordinate::new(2, 2)));
	assert!(!image.committed_chunk_exists(ChunkCoordinate::new(2, 2)));
	assert_eq!(image.find_chunk_aligned_most_up_to_date_bounds(), Some(IRect::from_size(UVec2::splat(768))));
	assert_eq!(image.find_chunk_aligned_committed_bounds(), None);

	image.commit();
	assert_eq!(image.find_tight_committed_bounds(), Some(IRect::from_size(UVec2::splat(610))));
}

#[test]
fn handles_fail_safely_after_disposal() {
	init_logger();
	let mut image = ChunkyImage::new(UVec2::splat(256));
	image.enqueue_rectangle(IRect::from_size(UVec2::splat(256)), Paint::new(Color::RED));
	image.commit();

	let handle = image.handle();
	let pinned = handle.reader().unwrap();
	let id = image.id();
	drop(image);

	assert!(handle.is_disposed());
	assert_eq!(handle.reader().err(), Some(ChunkyImageError::Disposed { image: id }));
	assert_eq!(pinned.committed_chunk(ChunkCoordinate::new(0, 0), Resolution::Full).err(), Some(ChunkyImageError::Disposed { image: id }));

	let mut surface = Surface::new(4, 4);
	assert_eq!(
		pinned.draw_most_up_to_date_region_on(IRect::from_size(UVec2::splat(4)), Resolution::Full, &mut surface, IVec2::ZERO),
		Err(ChunkyImageError::Disposed { image: id })
	);
}

#[test]
fn restoring_a_snapshot_reports_the_diff_and_invalidates_readers() {
	init_logger();
	let mut image = ChunkyImage::new(UVec2::splat(512));
	image.enqueue_rectangle(IRect::from_corners(IVec2::ZERO, IVec2::splat(10)), Paint::new(Color::RED));
	image.commit();
	let snapshot = image.committed_snapshot();

	image.enqueue_rectangle(IRect::from_corners(IVec2::new(300, 0), IVec2::new(310, 10)), Paint::new(Color::BLUE));
	image.commit();
	let reader = image.reader().unwrap();

	let affected = image.restore_committed(&snapshot);
	assert_eq!(affected.sorted_chunks(), vec![ChunkCoordinate::new(1, 0)]);
	assert_eq!(image.get_committed_pixel(IVec2::new(305, 5)), Color::TRANSPARENT);
	assert_eq!(image.get_committed_pixel(IVec2::new(5, 5)), Color::RED);
	assert!(matches!(reader.version_at(ChunkCoordinate::new(0, 0)), Err(ChunkyImageError::Stale { captured: 0, current: 1, .. })));
}

#[test]
fn clones_share_committed_chunks_until_drawn_over() {
	init_logger();
	let mut image = ChunkyImage::new(UVec2::splat(256));
	image.enqueue_rectangle(IRect::from_size(UVec2::splat(256)), Paint::new(Color::RED));
	image.commit();

	let mut clone = image.clone_from_committed();
	assert_ne!(clone.id(), image.id());
	clone.enqueue_rectangle(IRect::from_size(UVec2::splat(256)), Paint::new(Color::BLUE));
	clone.commit();

	assert_eq!(image.get_committed_pixel(IVec2::new(1, 1)), Color::RED);
	assert_eq!(clone.get_committed_pixel(IVec2::new(1, 1)), Color::BLUE);
}

#[test]
fn concurrent_readers_see_whole_commits() {
	init_logger();
	let mut image = ChunkyImage::new(UVec2::splat(256));
	let rect = IRect::from_size(UVec2::splat(256));
	image.enqueue_rectangle(rect, Paint::new(Color::RED));
	image.commit();

	let handle = image.handle();
	std::thread::scope(|scope| {
		let reader_thread = scope.spawn(|| {
			for _ in 0..50 {
				let Ok(reader) = handle.reader() else { return };
				let mut surface = Surface::new(32, 32);
				reader.draw_committed_region_on(rect, Resolution::Eighth, &mut surface, IVec2::ZERO).unwrap();
				let first = surface.data()[0];
				assert!(first == Color::RED || first == Color::BLUE);
				assert!(surface.data().iter().all(|&pixel| pixel == first));
			}
		});
		for color in [Color::BLUE, Color::RED, Color::BLUE] {
			image.enqueue_rectangle(rect, Paint::new(color));
			image.commit();
		}
		reader_thread.join().unwrap();
	});
}
