use crate::affected_area::AffectedArea;
use crate::chunk::{Chunk, ChunkCoordinate};
use crate::color::{BlendMode, Color};
use crate::error::ChunkyImageError;
use crate::lifetime::{ImageId, Lifetime};
use crate::mirror::ResolutionMirrorSet;
use crate::operation::{
	ClearRegionOperation, DrawOperation, EllipseOperation, FillMask, FlipAxis, FlipOperation, FloodFillOperation, FrozenImage, ImageOperation, Paint, PixelsOperation, RectangleOperation, StrokeOperation,
	SymmetryAxis,
};
use crate::rect::IRect;
use crate::resolution::Resolution;
use crate::settings::ChunkyImageSettings;
use crate::surface::Surface;
use glam::{DVec2, IVec2, UVec2};
use rustc_hash::{FxHashMap, FxHashSet, FxHasher};
use std::hash::{Hash, Hasher};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

#[derive(Debug)]
struct QueuedOperation {
	id: u64,
	operation: DrawOperation,
	/// Image size in effect when the operation was queued. Drawing is clipped to it.
	image_size: UVec2,
	affected: AffectedArea,
}

/// One consistent view of an image: committed chunks plus the pending queue on top of them.
///
/// States are immutable once published. Every mutation builds a new state and swaps it in, so readers holding an older `Arc` keep a consistent view.
#[derive(Debug, Clone)]
struct ImageState {
	committed: Arc<ResolutionMirrorSet>,
	pending: Vec<Arc<QueuedOperation>>,
	committed_size: UVec2,
	latest_size: UVec2,
	commit_counter: u64,
	/// Advances whenever the pending queue is replaced rather than appended to.
	queue_epoch: u64,
	lock_transparency: bool,
}

impl ImageState {
	fn empty(size: UVec2) -> Self {
		Self {
			committed: Arc::default(),
			pending: Vec::new(),
			committed_size: size,
			latest_size: size,
			commit_counter: 0,
			queue_epoch: 0,
			lock_transparency: false,
		}
	}

	fn pending_area(&self, from: usize) -> AffectedArea {
		let mut area = AffectedArea::new();
		for queued in self.pending.iter().skip(from) {
			area.union_with(&queued.affected);
		}
		area
	}

	fn is_touched_by_pending(&self, coordinate: ChunkCoordinate) -> bool {
		self.pending.iter().any(|queued| queued.affected.contains(coordinate))
	}

	fn all_chunks(&self) -> FxHashSet<ChunkCoordinate> {
		let mut chunks: FxHashSet<_> = self.committed.coordinates().collect();
		for queued in &self.pending {
			chunks.extend(queued.affected.chunks());
		}
		chunks
	}

	fn push(&mut self, id: u64, operation: DrawOperation) {
		if operation.is_noop() {
			log::trace!("Dropping no-op {} operation", operation.name());
			return;
		}
		if let DrawOperation::Resize(size) = operation {
			if size == self.latest_size {
				log::trace!("Dropping resize to the current size {size}");
				return;
			}
		}

		let affected = AffectedArea::for_operation(&operation, self.latest_size, self.all_chunks());
		let image_size = match operation {
			DrawOperation::Resize(size) => size,
			_ => self.latest_size,
		};
		if affected.is_empty() && !matches!(operation, DrawOperation::Resize(_)) {
			log::trace!("Dropping {} operation outside of the image", operation.name());
			return;
		}

		self.latest_size = image_size;
		self.pending.push(Arc::new(QueuedOperation { id, operation, image_size, affected }));
	}

	fn version_at(&self, image: ImageId, generation: u64, coordinate: ChunkCoordinate) -> u64 {
		let mut hasher = FxHasher::default();
		image.hash(&mut hasher);
		generation.hash(&mut hasher);
		self.committed.revision(coordinate).hash(&mut hasher);
		for queued in self.pending.iter().filter(|queued| queued.affected.contains(coordinate)) {
			queued.id.hash(&mut hasher);
		}
		self.lock_transparency.hash(&mut hasher);
		hasher.finish()
	}
}

#[derive(Debug)]
struct PreviewEntry {
	queue_epoch: u64,
	applied: usize,
	chunk: Arc<Chunk>,
}

/// Chunks with a prefix of the pending queue already replayed, so later reads only replay newer operations.
#[derive(Debug, Default)]
struct PreviewCache {
	entries: FxHashMap<(Resolution, ChunkCoordinate), PreviewEntry>,
}

#[derive(Debug)]
struct SharedImage {
	id: ImageId,
	lifetime: Lifetime,
	state: RwLock<Arc<ImageState>>,
	preview: Mutex<PreviewCache>,
	settings: ChunkyImageSettings,
}

impl SharedImage {
	fn state(&self) -> Arc<ImageState> {
		self.state.read().unwrap_or_else(PoisonError::into_inner).clone()
	}

	fn replace_state(&self, state: ImageState) {
		*self.state.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(state);
		self.preview().entries.clear();
	}

	fn preview(&self) -> MutexGuard<'_, PreviewCache> {
		self.preview.lock().unwrap_or_else(PoisonError::into_inner)
	}

	/// The committed chunk with every pending operation touching it replayed on top, or `None` when the coordinate is empty.
	///
	/// Operations are always replayed at full resolution. Lower levels are box-downsampled from the level above, the same way committed mirrors are derived.
	fn latest_chunk(&self, state: &ImageState, coordinate: ChunkCoordinate, resolution: Resolution) -> Option<Arc<Chunk>> {
		if !state.is_touched_by_pending(coordinate) {
			return state.committed.get(coordinate, resolution);
		}
		let Some(higher) = resolution.higher() else {
			return Some(self.latest_full_chunk(state, coordinate));
		};

		let key = (resolution, coordinate);
		let cached = self
			.preview()
			.entries
			.get(&key)
			.filter(|entry| entry.queue_epoch == state.queue_epoch && entry.applied == state.pending.len())
			.map(|entry| entry.chunk.clone());
		if cached.is_some() {
			return cached;
		}

		let chunk = Arc::new(self.latest_chunk(state, coordinate, higher)?.derive_lower(resolution));
		self.store_preview(key, state, chunk.clone());
		Some(chunk)
	}

	/// Full resolution preview, replaying only the operations queued since the cached entry was built.
	fn latest_full_chunk(&self, state: &ImageState, coordinate: ChunkCoordinate) -> Arc<Chunk> {
		let base = state.committed.get(coordinate, Resolution::Full);
		let key = (Resolution::Full, coordinate);
		let cached = self
			.preview()
			.entries
			.get(&key)
			.filter(|entry| entry.queue_epoch == state.queue_epoch && entry.applied <= state.pending.len())
			.map(|entry| (entry.applied, entry.chunk.clone()));

		let (start, mut chunk) = match cached {
			Some((applied, chunk)) => (applied, Arc::unwrap_or_clone(chunk)),
			None => (0, base.as_deref().cloned().unwrap_or_else(|| Chunk::transparent(Resolution::Full))),
		};
		for queued in &state.pending[start..] {
			if queued.affected.contains(coordinate) {
				queued.operation.draw_on_chunk(&mut chunk, coordinate, queued.image_size);
			}
		}
		let chunk = Arc::new(chunk);
		if start < state.pending.len() {
			self.store_preview(key, state, chunk.clone());
		}

		if state.lock_transparency {
			return Arc::new(lock_alpha(base.as_deref(), &chunk));
		}
		chunk
	}

	/// Full resolution entries hold the result before transparency locking. Lower levels hold the locked result, derived from the locked level above.
	fn store_preview(&self, key: (Resolution, ChunkCoordinate), state: &ImageState, chunk: Arc<Chunk>) {
		let mut preview = self.preview();
		if preview.entries.len() >= self.settings.preview_cache_limit {
			log::debug!("Flushing {} preview chunks of image {}", preview.entries.len(), self.id);
			preview.entries.clear();
		}
		preview.entries.insert(
			key,
			PreviewEntry {
				queue_epoch: state.queue_epoch,
				applied: state.pending.len(),
				chunk,
			},
		);
	}

	fn draw_region_on(&self, state: &ImageState, rect: IRect, resolution: Resolution, target: &mut Surface, offset: IVec2, latest: bool) {
		let divisor = resolution.divisor() as i32;
		let scaled = IRect {
			min: IVec2::new(rect.min.x.div_euclid(divisor), rect.min.y.div_euclid(divisor)),
			max: IVec2::new((rect.max.x + divisor - 1).div_euclid(divisor), (rect.max.y + divisor - 1).div_euclid(divisor)),
		};

		for coordinate in ChunkCoordinate::covering(&rect) {
			let chunk = if latest { self.latest_chunk(state, coordinate, resolution) } else { state.committed.get(coordinate, resolution) };
			let Some(chunk) = chunk else { continue };

			let origin = coordinate.origin() / divisor;
			let chunk_rect = IRect::from_position_size(origin, IVec2::splat(resolution.pixel_size() as i32));
			let Some(region) = scaled.intersect(&chunk_rect) else { continue };
			chunk.surface().draw_on(region.translate(-origin), target, offset + region.min - scaled.min, BlendMode::Normal);
		}
	}
}

/// Keeps the alpha of every pixel equal to the committed base while taking the drawn color.
fn lock_alpha(base: Option<&Chunk>, drawn: &Chunk) -> Chunk {
	let mut locked = drawn.clone();
	let size = locked.pixel_size();
	for y in 0..size {
		for x in 0..size {
			let base_color = base.map_or(Color::TRANSPARENT, |base| base.pixel(x, y));
			let Some(pixel) = locked.surface_mut().get_pixel_mut(x, y) else { continue };
			*pixel = if base_color.a() <= 0. {
				Color::TRANSPARENT
			} else if pixel.a() <= 0. {
				base_color
			} else {
				pixel.with_alpha(base_color.a())
			};
		}
	}
	locked
}

/// A cheap, shareable copy of an image's committed state, used to implement undo outside of the image.
#[derive(Debug, Clone)]
pub struct CommittedSnapshot {
	committed: Arc<ResolutionMirrorSet>,
	size: UVec2,
}

impl CommittedSnapshot {
	pub fn size(&self) -> UVec2 {
		self.size
	}

	pub fn chunk_count(&self) -> usize {
		self.committed.len()
	}
}

/// A sparse, chunked raster image with a committed state and a queue of pending operations previewed on top of it.
///
/// Mutation goes through `&mut self` on the owning `ChunkyImage`. Any number of [`ChunkyImageHandle`]s may read concurrently from other threads.
/// Dropping the image disposes it, after which every handle read fails with [`ChunkyImageError::Disposed`].
#[derive(Debug)]
pub struct ChunkyImage {
	shared: Arc<SharedImage>,
	horizontal_symmetry_axis: Option<f64>,
	vertical_symmetry_axis: Option<f64>,
	next_operation_id: u64,
}

impl ChunkyImage {
	pub fn new(size: UVec2) -> Self {
		Self::with_settings(size, ChunkyImageSettings::default())
	}

	pub fn with_settings(size: UVec2, settings: ChunkyImageSettings) -> Self {
		Self::from_state(ImageState::empty(size), settings)
	}

	fn from_state(state: ImageState, settings: ChunkyImageSettings) -> Self {
		Self {
			shared: Arc::new(SharedImage {
				id: ImageId::next(),
				lifetime: Lifetime::default(),
				state: RwLock::new(Arc::new(state)),
				preview: Mutex::new(PreviewCache::default()),
				settings,
			}),
			horizontal_symmetry_axis: None,
			vertical_symmetry_axis: None,
			next_operation_id: 0,
		}
	}

	pub fn id(&self) -> ImageId {
		self.shared.id
	}

	pub fn settings(&self) -> ChunkyImageSettings {
		self.shared.settings
	}

	pub fn is_disposed(&self) -> bool {
		self.shared.lifetime.is_disposed()
	}

	/// A thread-safe read handle that stays valid to hold after this image is dropped.
	pub fn handle(&self) -> ChunkyImageHandle {
		ChunkyImageHandle { shared: self.shared.clone() }
	}

	pub fn reader(&self) -> Result<ImageReader, ChunkyImageError> {
		self.handle().reader()
	}

	pub fn latest_size(&self) -> UVec2 {
		self.shared.state().latest_size
	}

	pub fn committed_size(&self) -> UVec2 {
		self.shared.state().committed_size
	}

	pub fn commit_counter(&self) -> u64 {
		self.shared.state().commit_counter
	}

	pub fn pending_operation_count(&self) -> usize {
		self.shared.state().pending.len()
	}

	pub fn generation(&self) -> u64 {
		self.shared.lifetime.generation()
	}

	// Session settings

	pub fn lock_transparency(&self) -> bool {
		self.shared.state().lock_transparency
	}

	/// While set, drawing keeps the committed alpha of every pixel. Reset by `commit` and `cancel_changes`.
	pub fn set_lock_transparency(&mut self, lock_transparency: bool) {
		if self.is_disposed() {
			return;
		}
		let state = self.shared.state();
		if state.lock_transparency != lock_transparency {
			self.shared.replace_state(ImageState { lock_transparency, ..(*state).clone() });
		}
	}

	pub fn set_horizontal_symmetry_axis(&mut self, axis: Option<f64>) {
		self.horizontal_symmetry_axis = axis.filter(|position| position.is_finite());
	}

	pub fn set_vertical_symmetry_axis(&mut self, axis: Option<f64>) {
		self.vertical_symmetry_axis = axis.filter(|position| position.is_finite());
	}

	fn reset_session(&mut self) {
		self.horizontal_symmetry_axis = None;
		self.vertical_symmetry_axis = None;
	}

	// Queueing

	/// Appends an operation to the pending queue without touching any pixels.
	///
	/// Operations that would draw nothing are dropped. While a symmetry axis is set, mirrorable operations are also queued mirrored.
	pub fn enqueue(&mut self, operation: impl Into<DrawOperation>) {
		let operation = operation.into();
		if self.is_disposed() {
			log::warn!("Ignoring {} operation queued on disposed image {}", operation.name(), self.id());
			return;
		}

		let mut operations = vec![operation];
		let axes = [self.horizontal_symmetry_axis.map(SymmetryAxis::Horizontal), self.vertical_symmetry_axis.map(SymmetryAxis::Vertical)];
		for axis in axes.into_iter().flatten() {
			let mirrored: Vec<_> = operations.iter().filter_map(|operation| operation.mirrored(axis)).collect();
			operations.extend(mirrored);
		}

		let mut state = (*self.shared.state()).clone();
		for operation in operations {
			self.next_operation_id += 1;
			state.push(self.next_operation_id, operation);
		}
		*self.shared.state.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(state);
	}

	pub fn enqueue_clear(&mut self) {
		self.enqueue(DrawOperation::Clear);
	}

	pub fn enqueue_clear_region(&mut self, rect: IRect) {
		self.enqueue(ClearRegionOperation::new(rect));
	}

	pub fn enqueue_rectangle(&mut self, rect: IRect, paint: Paint) {
		self.enqueue(RectangleOperation::new(rect, paint));
	}

	pub fn enqueue_ellipse(&mut self, ellipse: EllipseOperation) {
		self.enqueue(ellipse);
	}

	pub fn enqueue_stroke(&mut self, points: Vec<DVec2>, width: f64, paint: Paint) {
		self.enqueue(StrokeOperation::new(points, width, paint));
	}

	pub fn enqueue_pixels(&mut self, positions: Vec<IVec2>, paint: Paint) {
		self.enqueue(PixelsOperation::new(positions, paint));
	}

	pub fn enqueue_image(&mut self, surface: impl Into<Arc<Surface>>, position: IVec2, blend_mode: BlendMode) {
		self.enqueue(ImageOperation::new(surface, position).with_blend_mode(blend_mode));
	}

	/// Resizes the image once committed. Pixels outside the new size are cleared and chunks entirely outside it are dropped.
	pub fn enqueue_resize(&mut self, size: UVec2) {
		self.enqueue(DrawOperation::Resize(size));
	}

	/// Builds a flood fill from `seed` against the most up to date pixels. The image is only read.
	pub fn flood_fill(&self, seed: IVec2, color: Color, tolerance: f32) -> DrawOperation {
		let state = self.shared.state();
		let mut chunks: FxHashMap<ChunkCoordinate, Option<Arc<Chunk>>> = FxHashMap::default();
		let mask = FillMask::compute(seed, IRect::from_size(state.latest_size), tolerance, |pixel| {
			let coordinate = ChunkCoordinate::containing(pixel);
			let chunk = chunks.entry(coordinate).or_insert_with(|| self.shared.latest_chunk(&state, coordinate, Resolution::Full));
			let local = (pixel - coordinate.origin()).as_uvec2();
			chunk.as_ref().map_or(Color::TRANSPARENT, |chunk| chunk.pixel(local.x, local.y))
		});
		FloodFillOperation::new(mask, Paint::new(color)).into()
	}

	pub fn enqueue_flood_fill(&mut self, seed: IVec2, color: Color, tolerance: f32) {
		let operation = self.flood_fill(seed, color, tolerance);
		self.enqueue(operation);
	}

	/// Queues a flip of the whole image, using the current most up to date pixels as the source.
	pub fn enqueue_flip(&mut self, axis: FlipAxis) {
		let state = self.shared.state();
		let chunks = state
			.all_chunks()
			.into_iter()
			.filter_map(|coordinate| Some((coordinate, self.shared.latest_chunk(&state, coordinate, Resolution::Full)?)))
			.filter(|(_, chunk)| !chunk.is_fully_transparent())
			.collect();
		let source = FrozenImage { size: state.latest_size, chunks };
		self.enqueue(FlipOperation::new(axis, source));
	}

	// Commit and rollback

	/// Folds every pending operation into the committed chunks and returns the area that changed.
	///
	/// Readers observe either the state before or the state after the commit. An empty queue commits nothing.
	pub fn commit(&mut self) -> AffectedArea {
		self.reset_session();
		if self.is_disposed() {
			log::warn!("Ignoring commit on disposed image {}", self.id());
			return AffectedArea::new();
		}

		let state = self.shared.state();
		if state.pending.is_empty() {
			if state.lock_transparency {
				self.shared.replace_state(ImageState {
					lock_transparency: false,
					..(*state).clone()
				});
			}
			return AffectedArea::new();
		}

		let affected = state.pending_area(0);
		let mut committed = (*state.committed).clone();
		for coordinate in affected.chunks() {
			match self.shared.latest_chunk(&state, coordinate, Resolution::Full) {
				Some(chunk) => committed.insert_full(coordinate, chunk),
				None => {
					committed.remove(coordinate);
				}
			}
		}
		let bounds = IRect::from_size(state.latest_size);
		committed.retain(|coordinate| coordinate.pixel_rect().intersect(&bounds).is_some());

		log::debug!(
			"Committed {} operations on image {} touching {} chunks ({} chunks stored)",
			state.pending.len(),
			self.id(),
			affected.len(),
			committed.len()
		);
		self.shared.replace_state(ImageState {
			committed: Arc::new(committed),
			pending: Vec::new(),
			committed_size: state.latest_size,
			latest_size: state.latest_size,
			commit_counter: state.commit_counter + 1,
			queue_epoch: state.queue_epoch + 1,
			lock_transparency: false,
		});
		affected
	}

	/// Discards the pending queue and session settings, returning the area whose preview changes back.
	pub fn cancel_changes(&mut self) -> AffectedArea {
		self.reset_session();
		if self.is_disposed() {
			return AffectedArea::new();
		}

		let state = self.shared.state();
		if state.pending.is_empty() && !state.lock_transparency {
			return AffectedArea::new();
		}
		let affected = state.pending_area(0);
		log::debug!("Cancelled {} pending operations on image {}", state.pending.len(), self.id());
		self.shared.replace_state(ImageState {
			pending: Vec::new(),
			latest_size: state.committed_size,
			queue_epoch: state.queue_epoch + 1,
			lock_transparency: false,
			..(*state).clone()
		});
		affected
	}

	pub fn committed_snapshot(&self) -> CommittedSnapshot {
		let state = self.shared.state();
		CommittedSnapshot {
			committed: state.committed.clone(),
			size: state.committed_size,
		}
	}

	/// Replaces the committed state with a snapshot, dropping pending operations. Outstanding readers become stale.
	pub fn restore_committed(&mut self, snapshot: &CommittedSnapshot) -> AffectedArea {
		self.reset_session();
		if self.is_disposed() {
			return AffectedArea::new();
		}

		let state = self.shared.state();
		let affected = AffectedArea::diff(&state.committed, &snapshot.committed).union(&state.pending_area(0));
		let generation = self.shared.lifetime.advance_generation();
		log::debug!("Restored image {} to a snapshot of {} chunks (generation {generation})", self.id(), snapshot.committed.len());
		self.shared.replace_state(ImageState {
			committed: snapshot.committed.clone(),
			pending: Vec::new(),
			committed_size: snapshot.size,
			latest_size: snapshot.size,
			commit_counter: state.commit_counter + 1,
			queue_epoch: state.queue_epoch + 1,
			lock_transparency: false,
		});
		affected
	}

	/// A new independent image starting from this image's committed chunks, which stay shared until either side draws over them.
	pub fn clone_from_committed(&self) -> ChunkyImage {
		let state = self.shared.state();
		let mut clone = ImageState::empty(state.committed_size);
		clone.committed = state.committed.clone();
		ChunkyImage::from_state(clone, self.shared.settings)
	}

	/// Releases every chunk. Further reads through handles fail with [`ChunkyImageError::Disposed`].
	pub fn dispose(&mut self) {
		if !self.shared.lifetime.dispose() {
			return;
		}
		log::trace!("Disposing image {}", self.id());
		let size = self.shared.state().latest_size;
		self.shared.replace_state(ImageState::empty(size));
	}

	// Reads

	/// Draws the given full resolution region, scaled to `resolution`, with pending operations previewed on top of the committed chunks.
	pub fn draw_most_up_to_date_region_on(&self, rect: IRect, resolution: Resolution, target: &mut Surface, offset: IVec2) -> Result<(), ChunkyImageError> {
		self.reader()?.draw_most_up_to_date_region_on(rect, resolution, target, offset)
	}

	pub fn draw_committed_region_on(&self, rect: IRect, resolution: Resolution, target: &mut Surface, offset: IVec2) -> Result<(), ChunkyImageError> {
		self.reader()?.draw_committed_region_on(rect, resolution, target, offset)
	}

	pub fn get_committed_pixel(&self, position: IVec2) -> Color {
		let state = self.shared.state();
		if !IRect::from_size(state.committed_size).contains(position) {
			return Color::TRANSPARENT;
		}
		let coordinate = ChunkCoordinate::containing(position);
		let local = (position - coordinate.origin()).as_uvec2();
		state.committed.get(coordinate, Resolution::Full).map_or(Color::TRANSPARENT, |chunk| chunk.pixel(local.x, local.y))
	}

	pub fn get_most_up_to_date_pixel(&self, position: IVec2) -> Color {
		let state = self.shared.state();
		if !IRect::from_size(state.latest_size).contains(position) {
			return Color::TRANSPARENT;
		}
		let coordinate = ChunkCoordinate::containing(position);
		let local = (position - coordinate.origin()).as_uvec2();
		self.shared
			.latest_chunk(&state, coordinate, Resolution::Full)
			.map_or(Color::TRANSPARENT, |chunk| chunk.pixel(local.x, local.y))
	}

	/// Union of the areas of every pending operation.
	pub fn find_affected_area(&self) -> AffectedArea {
		self.shared.state().pending_area(0)
	}

	/// Union of the areas of the pending operations from `index` onward.
	pub fn find_affected_area_from(&self, index: usize) -> AffectedArea {
		self.shared.state().pending_area(index)
	}

	pub fn find_committed_chunks(&self) -> FxHashSet<ChunkCoordinate> {
		self.shared.state().committed.coordinates().collect()
	}

	/// Committed chunks together with every chunk pending operations touch.
	pub fn find_all_chunks(&self) -> FxHashSet<ChunkCoordinate> {
		self.shared.state().all_chunks()
	}

	pub fn committed_chunk_exists(&self, coordinate: ChunkCoordinate) -> bool {
		self.shared.state().committed.contains(coordinate)
	}

	pub fn latest_or_committed_chunk_exists(&self, coordinate: ChunkCoordinate) -> bool {
		let state = self.shared.state();
		state.committed.contains(coordinate) || state.is_touched_by_pending(coordinate)
	}

	pub fn find_chunk_aligned_committed_bounds(&self) -> Option<IRect> {
		self.shared.state().committed.chunk_aligned_bounds()
	}

	/// Chunk aligned bounds of every chunk that has visible content once pending operations are applied.
	pub fn find_chunk_aligned_most_up_to_date_bounds(&self) -> Option<IRect> {
		let state = self.shared.state();
		state
			.all_chunks()
			.into_iter()
			.filter(|&coordinate| {
				if state.is_touched_by_pending(coordinate) {
					self.shared.latest_chunk(&state, coordinate, Resolution::Full).is_some_and(|chunk| !chunk.is_fully_transparent())
				} else {
					state.committed.contains(coordinate)
				}
			})
			.map(|coordinate| coordinate.pixel_rect())
			.reduce(|a, b| a.union(&b))
	}

	/// Pixel exact bounds of the committed content.
	pub fn find_tight_committed_bounds(&self) -> Option<IRect> {
		let state = self.shared.state();
		state
			.committed
			.coordinates()
			.filter_map(|coordinate| {
				let chunk = state.committed.get(coordinate, Resolution::Full)?;
				Some(chunk.surface().opaque_bounds()?.translate(coordinate.origin()))
			})
			.reduce(|a, b| a.union(&b))
	}

	/// A hash that changes whenever the most up to date content of `coordinate` may have changed.
	pub fn version_at(&self, coordinate: ChunkCoordinate) -> u64 {
		self.shared.state().version_at(self.id(), self.generation(), coordinate)
	}
}

impl Drop for ChunkyImage {
	fn drop(&mut self) {
		self.dispose();
	}
}

/// A cloneable, thread-safe reference to an image that only permits reading.
#[derive(Debug, Clone)]
pub struct ChunkyImageHandle {
	shared: Arc<SharedImage>,
}

impl ChunkyImageHandle {
	pub fn id(&self) -> ImageId {
		self.shared.id
	}

	pub fn is_disposed(&self) -> bool {
		self.shared.lifetime.is_disposed()
	}

	/// Pins the current state for a series of consistent reads.
	pub fn reader(&self) -> Result<ImageReader, ChunkyImageError> {
		if self.is_disposed() {
			return Err(ChunkyImageError::Disposed { image: self.id() });
		}
		let generation = self.shared.lifetime.generation();
		Ok(ImageReader {
			shared: self.shared.clone(),
			state: self.shared.state(),
			generation,
		})
	}
}

impl PartialEq for ChunkyImageHandle {
	fn eq(&self, other: &Self) -> bool {
		Arc::ptr_eq(&self.shared, &other.shared)
	}
}

/// Reads from one pinned state of an image. Every read fails once the image is disposed or its committed state is replaced.
#[derive(Debug, Clone)]
pub struct ImageReader {
	shared: Arc<SharedImage>,
	state: Arc<ImageState>,
	generation: u64,
}

impl ImageReader {
	pub fn id(&self) -> ImageId {
		self.shared.id
	}

	pub fn generation(&self) -> u64 {
		self.generation
	}

	pub fn validate(&self) -> Result<(), ChunkyImageError> {
		if self.shared.lifetime.is_disposed() {
			return Err(ChunkyImageError::Disposed { image: self.id() });
		}
		let current = self.shared.lifetime.generation();
		if current != self.generation {
			return Err(ChunkyImageError::Stale {
				image: self.id(),
				captured: self.generation,
				current,
			});
		}
		Ok(())
	}

	pub fn latest_size(&self) -> UVec2 {
		self.state.latest_size
	}

	pub fn commit_counter(&self) -> u64 {
		self.state.commit_counter
	}

	pub fn most_up_to_date_chunk(&self, coordinate: ChunkCoordinate, resolution: Resolution) -> Result<Option<Arc<Chunk>>, ChunkyImageError> {
		self.validate()?;
		Ok(self.shared.latest_chunk(&self.state, coordinate, resolution))
	}

	pub fn committed_chunk(&self, coordinate: ChunkCoordinate, resolution: Resolution) -> Result<Option<Arc<Chunk>>, ChunkyImageError> {
		self.validate()?;
		Ok(self.state.committed.get(coordinate, resolution))
	}

	pub fn version_at(&self, coordinate: ChunkCoordinate) -> Result<u64, ChunkyImageError> {
		self.validate()?;
		Ok(self.state.version_at(self.id(), self.generation, coordinate))
	}

	pub fn draw_most_up_to_date_region_on(&self, rect: IRect, resolution: Resolution, target: &mut Surface, offset: IVec2) -> Result<(), ChunkyImageError> {
		self.validate()?;
		self.shared.draw_region_on(&self.state, rect, resolution, target, offset, true);
		Ok(())
	}

	pub fn draw_committed_region_on(&self, rect: IRect, resolution: Resolution, target: &mut Surface, offset: IVec2) -> Result<(), ChunkyImageError> {
		self.validate()?;
		self.shared.draw_region_on(&self.state, rect, resolution, target, offset, false);
		Ok(())
	}
}
