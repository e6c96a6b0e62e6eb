//! A reader instance: parameters, sequence detection and the answers given
//! to the host outside of render.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use ofxio_color::global_cache;
use ofxio_core::{
    OfxIoError, OfxTime, PixelComponents, Premultiplication, RangeD, RangeI, RectD, RenderScale,
    Result,
};
use ofxio_host::{
    ChangeReason, FileSystem, HostCapabilities, ParamSet, ParamValue, PersistentMessage,
    COLOR_PLANE,
};
use ofxio_imaging::ScratchPool;
use ofxio_sequence::{
    scan_sequence, FileSequence, FrameFilenames, FrameKind, FrameLocator, FrameMode, LocatedFrame,
    ParamFilenames, SequenceFilenames, SequenceTime, TimeMapper,
};
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::backend::ReaderBackend;
use crate::settings::{names, ReaderSettings, COMPONENT_CHOICES};

/// What the reader asks of its output clip.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClipPreferences {
    pub components: PixelComponents,
    pub premultiplication: Premultiplication,
    pub pixel_aspect_ratio: f64,
    pub frame_rate: f64,
}

/// Premultiplication announced on the output clip. Output is never
/// unpremultiplied: such files are premultiplied while rendering.
pub fn output_premultiplication(
    file: Premultiplication,
    components: PixelComponents,
) -> Premultiplication {
    match file {
        Premultiplication::UnPreMultiplied => Premultiplication::PreMultiplied,
        other => other,
    }
    .for_components(components)
}

/// Reader plugin instance, generic over the file format.
pub struct GenericReader {
    pub(crate) backend: Arc<dyn ReaderBackend>,
    pub(crate) fs: Arc<dyn FileSystem>,
    pub(crate) caps: HostCapabilities,
    pub(crate) params: ParamSet,
    pub(crate) settings: ReaderSettings,
    /// Files found by the last scan. Renders fill it lazily.
    sequence: Mutex<Option<Arc<SequenceFilenames>>>,
    pub(crate) pool: ScratchPool,
    pub(crate) message: PersistentMessage,
}

impl GenericReader {
    pub fn new(
        backend: Arc<dyn ReaderBackend>,
        fs: Arc<dyn FileSystem>,
        caps: HostCapabilities,
    ) -> Self {
        let settings = ReaderSettings::default();
        let mut params = ParamSet::new();
        settings.to_params(&mut params);
        let mut reader = Self {
            backend,
            fs,
            caps,
            params,
            settings,
            sequence: Mutex::new(None),
            pool: ScratchPool::default(),
            message: PersistentMessage::new(),
        };
        reader.refresh_param_flags();
        reader
    }

    /// Restore an instance from saved settings.
    pub fn with_settings(
        backend: Arc<dyn ReaderBackend>,
        fs: Arc<dyn FileSystem>,
        caps: HostCapabilities,
        settings: ReaderSettings,
    ) -> Result<Self> {
        settings.validate()?;
        let mut reader = Self::new(backend, fs, caps);
        settings.to_params(&mut reader.params);
        reader.settings = settings;
        reader.refresh_param_flags();
        Ok(reader)
    }

    pub fn settings(&self) -> &ReaderSettings {
        &self.settings
    }

    pub fn params(&self) -> &ParamSet {
        &self.params
    }

    /// Direct access for hosts setting values without a change
    /// notification, such as animated filename keys.
    pub fn params_mut(&mut self) -> &mut ParamSet {
        &mut self.params
    }

    pub fn message(&self) -> &PersistentMessage {
        &self.message
    }

    pub fn capabilities(&self) -> &HostCapabilities {
        &self.caps
    }

    /// Set a parameter as the user would.
    pub fn set_param(&mut self, name: &str, value: ParamValue) -> Result<()> {
        self.params.set(name, value);
        self.changed_param(name, ChangeReason::UserEdit)
    }

    /// React to a parameter change, keeping dependent parameters consistent.
    pub fn changed_param(&mut self, name: &str, reason: ChangeReason) -> Result<()> {
        let previous = self.settings.clone();
        let mut next = ReaderSettings::from_params(&self.params)?;
        // frame numbers are edited on the previous mapping so the
        // invariants between them survive
        let mode = next.frame_range.frame_mode;
        next.frame_range = previous.frame_range;
        next.frame_range.frame_mode = mode;

        match name {
            names::FILENAME => {
                self.settings = next;
                self.input_file_changed()?;
            }
            names::FIRST_FRAME | names::LAST_FRAME => {
                let value = self.params.get_int(name)?;
                if name == names::FIRST_FRAME {
                    next.frame_range.set_first_frame(value);
                } else {
                    next.frame_range.set_last_frame(value);
                }
                if reason == ChangeReason::UserEdit {
                    next.original_range.user_edited = true;
                }
                self.settings = next;
            }
            names::STARTING_TIME => {
                next.frame_range
                    .set_starting_time(self.params.get_int(names::STARTING_TIME)?);
                self.settings = next;
            }
            names::TIME_OFFSET => {
                next.frame_range
                    .set_time_offset(self.params.get_int(names::TIME_OFFSET)?);
                self.settings = next;
            }
            names::PROXY_FILENAME | names::CUSTOM_PROXY_SCALE => {
                self.settings = next;
                self.invalidate_sequence();
                if !self.settings.proxy.custom_scale {
                    if let Err(e) = self.detect_proxy_scale() {
                        warn!("proxy scale detection failed: {}", e);
                    }
                }
            }
            _ => self.settings = next,
        }

        self.settings.to_params(&mut self.params);
        self.refresh_param_flags();
        Ok(())
    }

    /// Rescan after the input file changed and reset what depends on it.
    fn input_file_changed(&mut self) -> Result<()> {
        self.invalidate_sequence();
        self.settings.original_range.invalidate();
        let Some(path) = self.first_filename() else {
            return Ok(());
        };

        let mut original = self.settings.original_range;
        let range = original.get_or_detect(|| self.detect_sequence_range())?;
        self.settings.original_range = original;
        if !self.settings.original_range.user_edited {
            self.settings.frame_range.reset(range);
        }
        info!(
            file = %path.display(),
            backend = self.backend.name(),
            "input changed, frames {}",
            range
        );

        match self.backend.plane_components(&path, COLOR_PLANE) {
            Ok(native) => {
                let components = self.caps.output_components(native);
                self.settings.output_components = if COMPONENT_CHOICES.contains(&components) {
                    components
                } else {
                    PixelComponents::Rgba
                };
                self.settings.premultiplication = match native {
                    PixelComponents::Rgba => self.backend.guess_premultiplication(&path)?,
                    other => Premultiplication::PreMultiplied.for_components(other),
                };
            }
            Err(e) => warn!("cannot read the layout of {}: {}", path.display(), e),
        }
        if let Some(space) = self.backend.guess_colorspace(&path) {
            self.settings.input_colorspace = space;
        }

        if !self.settings.proxy.custom_scale {
            if let Err(e) = self.detect_proxy_scale() {
                warn!("proxy scale detection failed: {}", e);
            }
        }
        Ok(())
    }

    /// A file of the input: the filename itself, or its first key on hosts
    /// animating it per frame.
    fn first_filename(&self) -> Option<PathBuf> {
        if !self.settings.filename.is_empty() {
            return Some(PathBuf::from(&self.settings.filename));
        }
        let first = *self.params.key_frames(names::FILENAME).first()?;
        self.params
            .get_string_at_time(names::FILENAME, first as f64)
            .filter(|s| !s.is_empty())
            .map(PathBuf::from)
    }

    /// Frame range of the current input, without the user's remapping.
    fn detect_sequence_range(&self) -> Result<RangeI> {
        let Some(path) = self.first_filename() else {
            return Ok(RangeI::new(1, 1));
        };
        if let Some(range) = self.backend.sequence_time_domain(&path)? {
            return Ok(range);
        }
        if self.caps.provides_frame_detection {
            let keys = self.params.key_frames(names::FILENAME);
            return Ok(match (keys.first(), keys.last()) {
                (Some(first), Some(last)) => RangeI::new(clamp_frame(*first), clamp_frame(*last)),
                _ => RangeI::new(1, 1),
            });
        }
        let sequence = self.sequence()?;
        Ok(sequence.full.frame_range().unwrap_or_else(|| {
            warn!("no frame found for {}", path.display());
            RangeI::new(1, 1)
        }))
    }

    /// Show, hide, enable and disable parameters to match the settings.
    fn refresh_param_flags(&mut self) {
        let p = &mut self.params;
        let proxy = &self.settings.proxy;
        p.set_enabled(names::CUSTOM_PROXY_SCALE, proxy.is_enabled());
        let custom = proxy.is_enabled() && proxy.custom_scale;
        p.set_enabled(names::PROXY_THRESHOLD, custom);
        p.set_enabled(names::ORIGINAL_PROXY_SCALE, custom);
        p.set_enabled(names::FRAME_RATE, self.settings.custom_fps);

        let by_offset = self.settings.frame_range.frame_mode == FrameMode::TimeOffset;
        p.set_secret(names::TIME_OFFSET, !by_offset);
        p.set_secret(names::STARTING_TIME, by_offset);
        p.set_secret(names::ORIGINAL_FRAME_RANGE, true);
        p.set_secret(names::TIME_DOMAIN_USER_EDITED, true);
        if !self.caps.supports_render_scale {
            p.set_secret(names::PROXY_FILENAME, true);
        }
    }

    fn scan(&self, name: &str) -> Result<FileSequence> {
        if name.is_empty() {
            return Ok(FileSequence::Still(PathBuf::new()));
        }
        let path = Path::new(name);
        if self.backend.sequence_time_domain(path)?.is_some() {
            return Ok(FileSequence::Still(path.to_path_buf()));
        }
        scan_sequence(self.fs.as_ref(), path)
    }

    /// The scanned sequence, scanning on first use.
    pub(crate) fn sequence(&self) -> Result<Arc<SequenceFilenames>> {
        let mut cached = self.sequence.lock();
        if let Some(sequence) = cached.as_ref() {
            return Ok(Arc::clone(sequence));
        }
        let full = self.scan(&self.settings.filename)?;
        let proxy = if self.settings.proxy.is_enabled() {
            Some(self.scan(&self.settings.proxy.filename)?)
        } else {
            None
        };
        debug!(frames = full.len(), "scanned sequence");
        let sequence = Arc::new(SequenceFilenames { full, proxy });
        *cached = Some(Arc::clone(&sequence));
        Ok(sequence)
    }

    fn invalidate_sequence(&self) {
        *self.sequence.lock() = None;
    }

    /// Run `f` with the per-frame file names: the animated parameter on
    /// hosts that detect sequences, the scanned sequence otherwise.
    pub(crate) fn with_filenames<R>(&self, f: impl FnOnce(&dyn FrameFilenames) -> R) -> Result<R> {
        if self.caps.provides_frame_detection {
            let names = ParamFilenames {
                params: &self.params,
                filename_param: names::FILENAME,
                proxy_param: names::PROXY_FILENAME,
            };
            Ok(f(&names))
        } else {
            let sequence = self.sequence()?;
            Ok(f(sequence.as_ref()))
        }
    }

    pub(crate) fn locate(&self, sequence_time: f64, want_proxy: bool) -> Result<LocatedFrame> {
        let policy = self.settings.missing_frame;
        self.with_filenames(|names| {
            FrameLocator::new(names, self.fs.as_ref(), policy).locate(sequence_time, want_proxy)
        })
    }

    pub fn time_mapper(&self) -> TimeMapper {
        self.settings
            .frame_range
            .time_mapper(self.settings.before, self.settings.after)
    }

    /// Sequence time for host time `time`; `None` when the output is black.
    pub(crate) fn resolve_time(&self, time: OfxTime) -> Result<Option<f64>> {
        match self.time_mapper().sequence_time(time) {
            SequenceTime::Error => Err(OfxIoError::OutOfRange),
            SequenceTime::Black => Ok(None),
            resolved => Ok(resolved.time()),
        }
    }

    /// Frames of the timeline covered by the reader.
    pub fn time_domain(&self) -> RangeD {
        self.settings.frame_range.time_domain().into()
    }

    /// Canonical bounds of the frame shown at `time`.
    ///
    /// Probed often by hosts, so failures never set a message.
    pub fn region_of_definition(&self, time: OfxTime) -> Result<RectD> {
        let Some(sequence_time) = self.resolve_time(time)? else {
            return Ok(RectD::default());
        };
        let located = self.locate(sequence_time, false)?;
        let Some(filename) = located.filename.as_deref().filter(|_| located.is_found()) else {
            return match located.kind {
                FrameKind::Black => Ok(RectD::default()),
                _ => Err(located.missing_error()),
            };
        };
        let info = self.backend.frame_info(filename, located.frame as f64)?;
        Ok(info
            .bounds
            .to_canonical(RenderScale::FULL, info.pixel_aspect_ratio))
    }

    pub fn clip_preferences(&self) -> Result<ClipPreferences> {
        let components = self.caps.output_components(self.settings.output_components);
        let premultiplication =
            output_premultiplication(self.settings.premultiplication, components);

        let first = self.settings.frame_range.first_frame() as f64;
        let located = self.locate(first, false)?;
        let (pixel_aspect_ratio, native_rate) = match located.filename.as_deref() {
            Some(path) if located.is_found() => (
                self.backend
                    .frame_info(path, located.frame as f64)
                    .map(|i| i.pixel_aspect_ratio)
                    .unwrap_or(1.0),
                self.backend.frame_rate(path),
            ),
            _ => (1.0, None),
        };
        let frame_rate = if self.settings.custom_fps {
            self.settings.frame_rate
        } else {
            native_rate.unwrap_or(self.settings.frame_rate)
        };
        Ok(ClipPreferences {
            components,
            premultiplication,
            pixel_aspect_ratio,
            frame_rate,
        })
    }

    /// The reader never passes its input through. Clears any stale message
    /// so that the host retries rendering.
    pub fn is_identity(&self, _time: OfxTime) -> bool {
        self.message.clear();
        false
    }

    /// Compare full and proxy frame sizes at the first frame and store the
    /// ratio as both the proxy scale and the threshold.
    ///
    /// Until a detection succeeds both stay at full scale, which keeps
    /// proxies off.
    pub fn detect_proxy_scale(&mut self) -> Result<Option<[f64; 2]>> {
        self.settings.proxy.original_scale = [1.0, 1.0];
        self.settings.proxy.threshold = [1.0, 1.0];
        if !self.settings.proxy.is_enabled() {
            return Ok(None);
        }
        let first = self.settings.frame_range.first_frame() as i64;
        let (full, proxy) =
            self.with_filenames(|n| (n.filename_at(first), n.proxy_filename_at(first)))?;
        let (Some(full), Some(proxy)) = (full, proxy) else {
            return Ok(None);
        };
        if !self.fs.exists(&full) || !self.fs.exists(&proxy) {
            return Ok(None);
        }
        let full_bounds = self.backend.frame_info(&full, first as f64)?.bounds;
        let proxy_bounds = self.backend.frame_info(&proxy, first as f64)?.bounds;
        if full_bounds.is_empty() || proxy_bounds.is_empty() {
            return Ok(None);
        }
        let ratio = |p: i32, f: i32| (p as f64 / f as f64).clamp(f64::MIN_POSITIVE, 1.0);
        let scale = [
            ratio(proxy_bounds.width(), full_bounds.width()),
            ratio(proxy_bounds.height(), full_bounds.height()),
        ];
        debug!(?scale, "detected proxy scale");
        self.settings.proxy.original_scale = scale;
        self.settings.proxy.threshold = scale;
        self.settings.to_params(&mut self.params);
        Ok(Some(scale))
    }

    /// Drop every cache the reader can reach.
    pub fn purge_caches(&self) {
        self.invalidate_sequence();
        self.pool.clear();
        global_cache().purge();
        self.backend.purge_caches();
        debug!("reader caches purged");
    }
}

fn clamp_frame(frame: i64) -> i32 {
    frame.clamp(i32::MIN as i64, i32::MAX as i64) as i32
}
