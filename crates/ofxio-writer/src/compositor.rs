//! From host planes to encodable parts.
//!
//! Every requested (view, plane) pair is fetched, checked against the
//! render, colour converted and premultiplied as the file wants, then
//! packed to the enabled channels. The resulting planes are grouped into
//! parts by the [`PartsSplitting`] policy; planes sharing a part are
//! interleaved in the order they were fetched.

use std::ops::Deref;

use ofxio_color::ColorConversion;
use ofxio_core::{
    BitDepth, ImageBuffer, OfxIoError, PixelComponents, Premultiplication, Result,
};
use ofxio_host::{HostImage, ImageSource, COLOR_PLANE};
use ofxio_imaging::{
    copy_window, interleave_into, pack_window, premultiply, unpremultiply, PackingPlan,
    ScratchBuffer, ScratchPool,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::backend::{channel_names, PartInfo};
use crate::settings::WriterSettings;
use crate::writer::WriteArgs;

/// How planes and views are distributed over the parts of a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PartsSplitting {
    /// Every view and layer interleaved in one part.
    SinglePart,
    /// One part per view holding all its layers.
    SplitViews,
    /// One part per view and layer.
    #[default]
    SplitViewsAndLayers,
}

impl PartsSplitting {
    pub const ALL: [Self; 3] = [Self::SinglePart, Self::SplitViews, Self::SplitViewsAndLayers];
}

/// Pixels owned by one render call: a fetched host image or a pooled
/// buffer.
#[derive(Debug)]
pub enum PlaneData<'p> {
    Host(HostImage),
    Scratch(ScratchBuffer<'p>),
}

impl Deref for PlaneData<'_> {
    type Target = ImageBuffer;

    fn deref(&self) -> &ImageBuffer {
        match self {
            Self::Host(image) => &image.buffer,
            Self::Scratch(buf) => buf,
        }
    }
}

/// One fetched and converted plane, covering exactly the render window.
#[derive(Debug)]
pub struct PreparedPlane<'p> {
    pub name: String,
    pub view: usize,
    pub premultiplication: Premultiplication,
    pub data: PlaneData<'p>,
}

impl PreparedPlane<'_> {
    pub fn is_color(&self) -> bool {
        self.name == COLOR_PLANE
    }
}

/// One buffer handed to the encoder.
#[derive(Debug)]
pub struct Part<'p> {
    pub info: PartInfo,
    pub data: PlaneData<'p>,
}

/// Builds the parts of one written frame.
pub struct PlaneCompositor<'a> {
    settings: &'a WriterSettings,
    pool: &'a ScratchPool,
    conversion: &'a dyn ColorConversion,
    args: &'a WriteArgs<'a>,
}

impl<'a> PlaneCompositor<'a> {
    pub fn new(
        settings: &'a WriterSettings,
        pool: &'a ScratchPool,
        conversion: &'a dyn ColorConversion,
        args: &'a WriteArgs<'a>,
    ) -> Self {
        Self {
            settings,
            pool,
            conversion,
            args,
        }
    }

    /// Fetch `layers` for every view in `views`.
    ///
    /// The layers found for the first view are the ones looked up in the
    /// other views; a later view lacking one of them just skips it.
    pub fn fetch(
        &self,
        source: &dyn ImageSource,
        views: &[usize],
        layers: &[String],
    ) -> Result<Vec<PreparedPlane<'a>>> {
        let mut actual: Vec<String> = Vec::new();
        let mut planes = Vec::new();
        for (i, &view) in views.iter().enumerate() {
            let wanted: &[String] = if i == 0 { layers } else { &actual };
            let mut found = Vec::new();
            for name in wanted {
                self.args.abort.check()?;
                let Some(image) = source.fetch_image(self.args.time, view, name)? else {
                    debug!(plane = %name, view, "plane not available");
                    continue;
                };
                planes.push(self.prepare(name, view, image)?);
                found.push(name.clone());
            }
            if i == 0 {
                actual = found;
            }
        }
        Ok(planes)
    }

    /// Bring one fetched image into the state and layout the file wants.
    fn prepare(&self, name: &str, view: usize, mut image: HostImage) -> Result<PreparedPlane<'a>> {
        self.check_image(name, &image)?;
        let abort = self.args.abort;
        let window = self.args.render_window;
        let components = image.buffer.components();
        let rgba = components == PixelComponents::Rgba;
        let is_color = name == COLOR_PLANE;

        let mut state = image.premultiplication.for_components(components);
        if let Some(area) = window.intersect(image.buffer.bounds()) {
            // colour conversion works on unpremultiplied pixels
            if is_color && !self.conversion.is_identity(self.args.time) {
                if rgba && state == Premultiplication::PreMultiplied {
                    unpremultiply(&mut image.buffer, area, abort)?;
                    state = Premultiplication::UnPreMultiplied;
                }
                self.conversion
                    .apply(self.args.time, area, &mut image.buffer, abort)?;
            }
            let target = self.settings.premultiplication.for_components(components);
            match (state, target) {
                (Premultiplication::UnPreMultiplied, Premultiplication::PreMultiplied) if rgba => {
                    premultiply(&mut image.buffer, area, abort)?;
                    state = target;
                }
                (Premultiplication::PreMultiplied, Premultiplication::UnPreMultiplied) if rgba => {
                    unpremultiply(&mut image.buffer, area, abort)?;
                    state = target;
                }
                _ => {}
            }
        }

        let plan = if is_color {
            PackingPlan::from_enabled_channels(
                components,
                self.settings.output_components,
                self.settings.process_channels,
            )?
        } else {
            PackingPlan::identity(components)
        };
        let data = if !plan.is_identity(components) {
            trace!(plane = name, mapping = ?plan.mapping(), "packing");
            let mut buf = self.pool.acquire(window, plan.output_components())?;
            pack_window(&image.buffer, &mut buf, window, &plan, abort)?;
            PlaneData::Scratch(buf)
        } else if image.buffer.bounds() != window {
            let mut buf = self.pool.acquire(window, components)?;
            copy_window(&image.buffer, &mut buf, window, abort)?;
            PlaneData::Scratch(buf)
        } else {
            PlaneData::Host(image)
        };

        Ok(PreparedPlane {
            name: name.to_string(),
            view,
            premultiplication: state.for_components(data.components()),
            data,
        })
    }

    fn check_image(&self, name: &str, image: &HostImage) -> Result<()> {
        if image.bit_depth != BitDepth::Float {
            return Err(OfxIoError::FormatMismatch(format!(
                "plane {name} has unsupported bit depth {:?}",
                image.bit_depth
            )));
        }
        if image.render_scale != self.args.render_scale {
            return Err(OfxIoError::FormatMismatch(format!(
                "plane {name} is at scale {:?} for a render at {:?}",
                image.render_scale, self.args.render_scale
            )));
        }
        if image.field != self.args.field {
            return Err(OfxIoError::FormatMismatch(format!(
                "plane {name} has field {:?} for a render of field {:?}",
                image.field, self.args.field
            )));
        }
        if image.buffer.components() == PixelComponents::None {
            return Err(OfxIoError::FormatMismatch(format!("plane {name} has no channel")));
        }
        Ok(())
    }

    /// Group `planes` into parts.
    pub fn split(
        &self,
        planes: Vec<PreparedPlane<'a>>,
        splitting: PartsSplitting,
        view_names: &[String],
    ) -> Result<Vec<Part<'a>>> {
        let view_name = |view: usize| {
            view_names
                .get(view)
                .cloned()
                .unwrap_or_else(|| format!("view{view}"))
        };
        let multi_view = planes
            .first()
            .is_some_and(|first| planes.iter().any(|p| p.view != first.view));

        match splitting {
            PartsSplitting::SplitViewsAndLayers => Ok(planes
                .into_iter()
                .map(|p| {
                    let view = view_name(p.view);
                    let name = if multi_view {
                        format!("{view}.{}", p.name)
                    } else {
                        p.name.clone()
                    };
                    let components = p.data.components();
                    Part {
                        info: PartInfo {
                            name,
                            view_name: view,
                            channel_names: channel_names(&p.name, components, p.is_color()),
                            components,
                        },
                        data: p.data,
                    }
                })
                .collect()),
            PartsSplitting::SplitViews => {
                let mut groups: Vec<Vec<PreparedPlane<'a>>> = Vec::new();
                for plane in planes {
                    match groups.last_mut() {
                        Some(group) if group[0].view == plane.view => group.push(plane),
                        _ => groups.push(vec![plane]),
                    }
                }
                groups
                    .into_iter()
                    .map(|group| {
                        let view = view_name(group[0].view);
                        self.merge(group, view.clone(), view, None)
                    })
                    .collect()
            }
            PartsSplitting::SinglePart => {
                let Some(first) = planes.first() else {
                    return Ok(Vec::new());
                };
                let view = view_name(first.view);
                let prefix_views = multi_view.then_some(view_names);
                let part = self.merge(planes, view.clone(), view, prefix_views)?;
                Ok(vec![part])
            }
        }
    }

    /// One part from `planes`, interleaved when there are several.
    /// With `prefix_views`, channel names carry their view name.
    fn merge(
        &self,
        mut planes: Vec<PreparedPlane<'a>>,
        name: String,
        view_name: String,
        prefix_views: Option<&[String]>,
    ) -> Result<Part<'a>> {
        let mut channels = Vec::new();
        for p in &planes {
            let names = channel_names(&p.name, p.data.components(), p.is_color());
            match prefix_views.and_then(|v| v.get(p.view)) {
                Some(view) => channels.extend(names.into_iter().map(|c| format!("{view}.{c}"))),
                None => channels.extend(names),
            }
        }

        if planes.len() == 1 {
            if let Some(plane) = planes.pop() {
                let components = plane.data.components();
                return Ok(Part {
                    info: PartInfo {
                        name,
                        view_name,
                        channel_names: channels,
                        components,
                    },
                    data: plane.data,
                });
            }
        }

        let window = self.args.render_window;
        let total: usize = planes.iter().map(|p| p.data.channels()).sum();
        let components = PixelComponents::Custom(total as u32);
        let mut buf = self.pool.acquire(window, components)?;
        let mut offset = 0;
        for p in &planes {
            interleave_into(&p.data, &mut buf, offset, window, self.args.abort)?;
            offset += p.data.channels();
        }
        trace!(part = %name, channels = total, "interleaved");
        Ok(Part {
            info: PartInfo {
                name,
                view_name,
                channel_names: channels,
                components,
            },
            data: PlaneData::Scratch(buf),
        })
    }
}
