//! In-memory source and backend for unit tests.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};

use ofxio_core::{
    ImageBuffer, OfxTime, PixelComponents, Premultiplication, RangeD, RectI, Result,
};
use ofxio_host::{HostImage, ImageSource};
use parking_lot::Mutex;

use crate::backend::{EncodeRequest, EncodeSession, PartInfo, WriterBackend};

/// Value of channel `c` at `(x, y)` in generated planes.
pub fn sample(x: i32, y: i32, c: usize) -> f32 {
    ((x * 5 + y * 11 + c as i32 * 7).rem_euclid(13)) as f32 / 12.0
}

pub fn pattern(bounds: RectI, components: PixelComponents) -> ImageBuffer {
    let mut buf = ImageBuffer::new(bounds, components).unwrap();
    for y in bounds.y1..bounds.y2 {
        for x in bounds.x1..bounds.x2 {
            for (c, v) in buf.pixel_mut(x, y).unwrap().iter_mut().enumerate() {
                *v = sample(x, y, c);
            }
        }
    }
    buf
}

/// Clip with fixed planes per view.
pub struct TestSource {
    pub views: Vec<String>,
    pub planes: HashMap<(usize, String), ImageBuffer>,
    pub premultiplication: Premultiplication,
    pub range: RangeD,
    pub fetches: AtomicUsize,
}

impl TestSource {
    pub fn new(views: &[&str]) -> Self {
        Self {
            views: views.iter().map(|v| v.to_string()).collect(),
            planes: HashMap::new(),
            premultiplication: Premultiplication::PreMultiplied,
            range: RangeD::new(1.0, 10.0),
            fetches: AtomicUsize::new(0),
        }
    }

    pub fn with_plane(mut self, view: usize, name: &str, buffer: ImageBuffer) -> Self {
        self.planes.insert((view, name.to_string()), buffer);
        self
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

impl ImageSource for TestSource {
    fn fetch_image(&self, _time: OfxTime, view: usize, plane: &str) -> Result<Option<HostImage>> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .planes
            .get(&(view, plane.to_string()))
            .map(|buf| HostImage::new(buf.clone(), self.premultiplication)))
    }

    fn view_names(&self) -> Vec<String> {
        self.views.clone()
    }

    fn frame_range(&self) -> RangeD {
        self.range
    }
}

#[derive(Debug, Clone)]
pub struct Encoded {
    pub filename: PathBuf,
    pub view_name: String,
    pub premultiplication: Premultiplication,
    pub buffer: ImageBuffer,
}

#[derive(Debug, Clone, Default)]
pub struct RecordedFile {
    pub filename: PathBuf,
    pub parts: Vec<PartInfo>,
    pub buffers: Vec<(usize, ImageBuffer)>,
}

/// Backend keeping everything it is asked to write.
#[derive(Default)]
pub struct RecordingBackend {
    pub multi_part: bool,
    pub any_layout: bool,
    pub encoded: Mutex<Vec<Encoded>>,
    pub files: Mutex<Vec<RecordedFile>>,
}

impl RecordingBackend {
    pub fn multi_part() -> Self {
        Self {
            multi_part: true,
            any_layout: true,
            ..Self::default()
        }
    }
}

struct RecordingSession<'a> {
    backend: &'a RecordingBackend,
    file: RecordedFile,
}

impl EncodeSession for RecordingSession<'_> {
    fn encode_part(&mut self, index: usize, buffer: &ImageBuffer) -> Result<()> {
        self.file.buffers.push((index, buffer.clone()));
        Ok(())
    }

    fn finish(self: Box<Self>) -> Result<()> {
        self.backend.files.lock().push(self.file);
        Ok(())
    }
}

impl WriterBackend for RecordingBackend {
    fn name(&self) -> &str {
        "recording"
    }

    fn supports_components(&self, components: PixelComponents) -> bool {
        self.any_layout
            || matches!(
                components,
                PixelComponents::Rgb | PixelComponents::Rgba | PixelComponents::Alpha
            )
    }

    fn supports_multi_part(&self) -> bool {
        self.multi_part
    }

    fn encode(&self, request: &EncodeRequest<'_>, buffer: &ImageBuffer) -> Result<()> {
        self.encoded.lock().push(Encoded {
            filename: request.filename.to_path_buf(),
            view_name: request.view_name.to_string(),
            premultiplication: request.premultiplication,
            buffer: buffer.clone(),
        });
        Ok(())
    }

    fn begin_parts<'s>(
        &'s self,
        request: &EncodeRequest<'_>,
        parts: &[PartInfo],
    ) -> Result<Box<dyn EncodeSession + 's>> {
        Ok(Box::new(RecordingSession {
            backend: self,
            file: RecordedFile {
                filename: request.filename.to_path_buf(),
                parts: parts.to_vec(),
                buffers: Vec::new(),
            },
        }))
    }
}
