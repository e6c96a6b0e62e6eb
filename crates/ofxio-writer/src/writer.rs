//! A writer instance: parameters, output file names and the render that
//! encodes a frame.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use ofxio_color::{global_cache, ColorspaceConversion};
use ofxio_core::{
    AbortSignal, ImageField, OfxIoError, OfxTime, PixelComponents, RangeD, RectI, RenderScale,
    Result,
};
use ofxio_host::{
    ChangeReason, HostCapabilities, ImageSource, OfxStatus, ParamSet, ParamValue,
    PersistentMessage, COLOR_PLANE,
};
use ofxio_imaging::{PackingPlan, ScratchPool};
use ofxio_sequence::{expand_filename, has_frame_token};
use tracing::{debug, info};

use crate::backend::{EncodeRequest, WriterBackend};
use crate::compositor::{Part, PlaneCompositor, PlaneData};
use crate::settings::{names, FrameRangeChoice, ViewSelection, WriterSettings};

/// Arguments of one render call.
#[derive(Debug, Clone, Copy)]
pub struct WriteArgs<'a> {
    pub time: OfxTime,
    pub render_scale: RenderScale,
    pub render_window: RectI,
    pub field: ImageField,
    /// View the host is rendering.
    pub view: usize,
    pub abort: &'a AbortSignal,
}

impl<'a> WriteArgs<'a> {
    /// Full frame render of `window` at `time`.
    pub fn new(time: OfxTime, window: RectI, abort: &'a AbortSignal) -> Self {
        Self {
            time,
            render_scale: RenderScale::FULL,
            render_window: window,
            field: ImageField::None,
            view: 0,
            abort,
        }
    }
}

/// Writer plugin instance, generic over the file format.
pub struct GenericWriter {
    pub(crate) backend: Arc<dyn WriterBackend>,
    pub(crate) caps: HostCapabilities,
    pub(crate) params: ParamSet,
    pub(crate) settings: WriterSettings,
    pub(crate) pool: ScratchPool,
    pub(crate) message: PersistentMessage,
}

impl GenericWriter {
    pub fn new(backend: Arc<dyn WriterBackend>, caps: HostCapabilities) -> Self {
        let settings = WriterSettings {
            premultiplication: backend.expected_premultiplication(),
            ..WriterSettings::default()
        };
        let mut params = ParamSet::new();
        settings.to_params(&mut params);
        let mut writer = Self {
            backend,
            caps,
            params,
            settings,
            pool: ScratchPool::default(),
            message: PersistentMessage::new(),
        };
        writer.refresh_param_flags();
        writer
    }

    /// Restore an instance from saved settings.
    pub fn with_settings(
        backend: Arc<dyn WriterBackend>,
        caps: HostCapabilities,
        settings: WriterSettings,
    ) -> Result<Self> {
        settings.validate()?;
        let mut writer = Self::new(backend, caps);
        settings.to_params(&mut writer.params);
        writer.settings = settings;
        writer.refresh_param_flags();
        Ok(writer)
    }

    pub fn settings(&self) -> &WriterSettings {
        &self.settings
    }

    pub fn params(&self) -> &ParamSet {
        &self.params
    }

    pub fn message(&self) -> &PersistentMessage {
        &self.message
    }

    /// Set a parameter as the user would.
    pub fn set_param(&mut self, name: &str, value: ParamValue) -> Result<()> {
        self.params.set(name, value);
        self.changed_param(name, ChangeReason::UserEdit)
    }

    /// React to a parameter change, keeping dependent parameters consistent.
    pub fn changed_param(&mut self, name: &str, reason: ChangeReason) -> Result<()> {
        if matches!(name, names::FIRST_FRAME | names::LAST_FRAME) {
            // keep first <= last by moving the other end
            let first = self.params.get_int(names::FIRST_FRAME)?;
            let last = self.params.get_int(names::LAST_FRAME)?;
            if first > last {
                if name == names::FIRST_FRAME {
                    self.params.set(names::LAST_FRAME, ParamValue::Int(first));
                } else {
                    self.params.set(names::FIRST_FRAME, ParamValue::Int(last));
                }
            }
        }
        let mut next = WriterSettings::from_params(&self.params)?;

        if name == names::FILENAME {
            if let Some(space) = self.backend.guess_colorspace(Path::new(&next.filename)) {
                next.output_colorspace = space;
            }
            if !next.filename.is_empty() && !has_frame_token(&next.filename) {
                info!(file = %next.filename, "output name has no frame number");
            }
            debug!(?reason, backend = self.backend.name(), "output file changed");
        }

        self.settings = next;
        self.settings.to_params(&mut self.params);
        self.refresh_param_flags();
        Ok(())
    }

    fn refresh_param_flags(&mut self) {
        let p = &mut self.params;
        let components = self.settings.output_components;
        let has_color = matches!(components, PixelComponents::Rgb | PixelComponents::Rgba);
        for name in &names::PROCESS[..3] {
            p.set_enabled(name, has_color);
        }
        p.set_enabled(names::PROCESS_A, components.alpha_index().is_some());

        let manual = self.settings.frame_range == FrameRangeChoice::Manual;
        p.set_secret(names::FIRST_FRAME, !manual);
        p.set_secret(names::LAST_FRAME, !manual);

        p.set_enabled(names::PARTS_SPLITTING, self.backend.supports_multi_part());
        p.set_secret(names::LAYERS, !self.caps.supports_multi_planar);
        p.set_secret(names::VIEWS, !self.caps.supports_multi_view);
    }

    /// Output file for `time` and `view_name`.
    pub fn filename_at(&self, time: OfxTime, view_name: &str) -> PathBuf {
        let frame = (time + 0.5).floor() as i64;
        PathBuf::from(expand_filename(&self.settings.filename, frame, view_name))
    }

    /// Frames to render, given the input clip and the project's range.
    pub fn frame_range(&self, source: &dyn ImageSource, project: RangeD) -> RangeD {
        self.settings.frames(source.frame_range(), project)
    }

    /// The writer always writes. Clears any stale message so that the host
    /// retries rendering.
    pub fn is_identity(&self, _time: OfxTime) -> bool {
        self.message.clear();
        false
    }

    /// Fetch, convert and encode one frame. Failures set the persistent
    /// message, except cancellation.
    pub fn render(&self, args: &WriteArgs<'_>, source: &dyn ImageSource) -> OfxStatus {
        let result = self.write_frame(args, source);
        match &result {
            Err(e) if e.is_reportable() => self.message.set_error(e.to_string()),
            Err(_) => debug!(time = args.time, "write aborted"),
            Ok(()) => {}
        }
        OfxStatus::from_result(&result)
    }

    fn write_frame(&self, args: &WriteArgs<'_>, source: &dyn ImageSource) -> Result<()> {
        if !args.render_scale.is_full() {
            return Err(OfxIoError::FormatMismatch(format!(
                "writers render at full resolution only, got scale {:?}",
                args.render_scale
            )));
        }
        if self.settings.filename.is_empty() {
            return Err(OfxIoError::Configuration("no output file name".into()));
        }
        // reject an impossible channel selection before fetching anything
        PackingPlan::from_enabled_channels(
            PixelComponents::Rgba,
            self.settings.output_components,
            self.settings.process_channels,
        )?;
        args.abort.check()?;

        let view_names = source.view_names();
        let views: Vec<usize> = match self.settings.views {
            ViewSelection::All if self.caps.supports_multi_view => (0..view_names.len()).collect(),
            _ => vec![args.view],
        };
        let layers: Vec<String> = if self.caps.supports_multi_planar {
            self.settings.layers.clone()
        } else {
            vec![COLOR_PLANE.to_string()]
        };

        let conversion = ColorspaceConversion::new(
            self.settings.input_colorspace,
            self.settings.output_colorspace,
            self.settings.filename.clone(),
        );
        let compositor = PlaneCompositor::new(&self.settings, &self.pool, &conversion, args);
        let planes = compositor.fetch(source, &views, &layers)?;
        let Some(first) = planes.first() else {
            return Err(OfxIoError::Configuration(format!(
                "none of the layers {} exists in the input",
                layers.join(", ")
            )));
        };

        let view_name = view_names
            .get(first.view)
            .map(String::as_str)
            .unwrap_or("Main");
        let pixel_aspect_ratio = match &first.data {
            PlaneData::Host(image) => image.pixel_aspect_ratio,
            PlaneData::Scratch(_) => 1.0,
        };
        let filename = self.filename_at(args.time, view_name);
        let request = EncodeRequest {
            filename: &filename,
            time: args.time,
            view_name,
            window: args.render_window,
            pixel_aspect_ratio,
            premultiplication: self.settings.premultiplication,
        };

        let parts = compositor.split(planes, self.settings.parts_splitting, &view_names)?;
        args.abort.check()?;
        match parts.as_slice() {
            // interleaved parts keep their channel names through a session
            [part] if !matches!(part.info.components, PixelComponents::Custom(_)) => {
                self.encode_single(&request, part)
            }
            _ => self.encode_parts(&request, &parts, args.abort),
        }
    }

    fn encode_single(&self, request: &EncodeRequest<'_>, part: &Part<'_>) -> Result<()> {
        let components = part.data.components();
        if !self.backend.supports_components(components) {
            return Err(OfxIoError::FormatMismatch(format!(
                "the {} format cannot store {:?} images",
                self.backend.name(),
                components
            )));
        }
        debug!(file = %request.filename.display(), ?components, "encode");
        self.backend.encode(request, &part.data)
    }

    fn encode_parts(
        &self,
        request: &EncodeRequest<'_>,
        parts: &[Part<'_>],
        abort: &AbortSignal,
    ) -> Result<()> {
        if !self.backend.supports_multi_part() {
            return Err(OfxIoError::Configuration(format!(
                "the {} format cannot hold several layers or views; write one layer or change the splitting",
                self.backend.name()
            )));
        }
        let infos: Vec<_> = parts.iter().map(|p| p.info.clone()).collect();
        debug!(file = %request.filename.display(), parts = infos.len(), "multi-part encode");
        let mut session = self.backend.begin_parts(request, &infos)?;
        for (index, part) in parts.iter().enumerate() {
            abort.check()?;
            session.encode_part(index, &part.data)?;
        }
        session.finish()
    }

    /// Drop every cache the writer can reach.
    pub fn purge_caches(&self) {
        self.pool.clear();
        global_cache().purge();
        debug!("writer caches purged");
    }
}
