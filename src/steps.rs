//! Transform steps written as short text commands.
//!
//! Steps come from the `steps` list in the config file and from repeated
//! `--step` flags on the command line:
//!
//! ```text
//! rotate 90
//! scale 4
//! box-scale 0.5 0.25
//! crop 10 10 640 480
//! resolution 300
//! colorspace gray8
//! bcg 0.1 0.2 1.0
//! ```
//!
//! A step parses once and is applied to any number of images.

use crate::imaging::{Color, Colorspace, Image, ImagingError, ScaleFilter};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum StepParseError {
    #[error("empty step")]
    Empty,
    #[error("unknown step: {0}")]
    Unknown(String),
    #[error("step '{step}' is missing its {argument} argument")]
    MissingArgument {
        step: &'static str,
        argument: &'static str,
    },
    #[error("step '{step}': '{token}' is not a valid number")]
    InvalidNumber { step: &'static str, token: String },
    #[error("step '{step}': unexpected argument '{token}'")]
    UnexpectedArgument { step: &'static str, token: String },
    #[error("step 'colorspace': unknown colorspace '{0}'")]
    UnknownColorspace(String),
}

/// One in-place image transform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Step {
    Rotate(f64),
    Scale {
        filter: ScaleFilter,
        fx: f64,
        fy: Option<f64>,
    },
    FlipX,
    FlipY,
    Crop {
        x: u32,
        y: u32,
        width: u32,
        height: u32,
    },
    AutoCrop,
    Resize {
        width: u32,
        height: u32,
    },
    Resolution {
        x: u32,
        y: Option<u32>,
    },
    Colorspace(Colorspace),
    Invert,
    Normalize,
    BrightnessContrastGamma {
        brightness: f64,
        contrast: f64,
        gamma: f64,
    },
    HueSaturationLightness {
        hue: f64,
        saturation: f64,
        lightness: f64,
    },
}

/// Command name for each scale filter.
const SCALE_NAMES: &[(&str, ScaleFilter)] = &[
    ("scale", ScaleFilter::Best),
    ("nearest-scale", ScaleFilter::Nearest),
    ("bilinear-scale", ScaleFilter::Bilinear),
    ("box-scale", ScaleFilter::Box),
    ("thumbnail-scale", ScaleFilter::Thumbnail),
];

impl Step {
    /// Apply to `image`. `background` fills pixels uncovered by a rotation.
    pub fn apply(&self, image: &mut Image, background: Color) -> Result<(), ImagingError> {
        match *self {
            Step::Rotate(angle) => image.rotate(angle, background),
            Step::Scale { filter, fx, fy } => match filter {
                ScaleFilter::Best => image.scale(fx, fy)?,
                ScaleFilter::Nearest => image.nearest_scale(fx, fy)?,
                ScaleFilter::Bilinear => image.bilinear_scale(fx, fy)?,
                ScaleFilter::Box => image.box_scale(fx, fy)?,
                ScaleFilter::Thumbnail => image.thumbnail_scale(fx, fy)?,
            },
            Step::FlipX => image.flip_x(),
            Step::FlipY => image.flip_y(),
            Step::Crop {
                x,
                y,
                width,
                height,
            } => image.crop(x, y, width, height)?,
            Step::AutoCrop => image.fast_auto_crop(),
            Step::Resize { width, height } => image.resize_canvas(width, height)?,
            Step::Resolution { x, y } => image.set_resolution(x, y.unwrap_or(x)),
            Step::Colorspace(cs) => image.convert_colorspace(cs.name())?,
            Step::Invert => image.invert(),
            Step::Normalize => image.normalize(),
            Step::BrightnessContrastGamma {
                brightness,
                contrast,
                gamma,
            } => image.brightness_contrast_gamma(brightness, contrast, gamma)?,
            Step::HueSaturationLightness {
                hue,
                saturation,
                lightness,
            } => image.hue_saturation_lightness(hue, saturation, lightness)?,
        }
        Ok(())
    }
}

/// Apply `steps` in order, stopping at the first failure.
pub fn apply_all(steps: &[Step], image: &mut Image, background: Color) -> Result<(), ImagingError> {
    steps.iter().try_for_each(|step| step.apply(image, background))
}

/// Cursor over the argument tokens of one step.
struct Args<'a> {
    step: &'static str,
    tokens: std::str::SplitWhitespace<'a>,
}

impl<'a> Args<'a> {
    fn next_token(&mut self, argument: &'static str) -> Result<&'a str, StepParseError> {
        self.tokens.next().ok_or(StepParseError::MissingArgument {
            step: self.step,
            argument,
        })
    }

    fn number<T: FromStr>(&mut self, argument: &'static str) -> Result<T, StepParseError> {
        let token = self.next_token(argument)?;
        self.parse(token)
    }

    fn optional<T: FromStr>(&mut self) -> Result<Option<T>, StepParseError> {
        self.tokens.next().map(|t| self.parse(t)).transpose()
    }

    fn parse<T: FromStr>(&self, token: &str) -> Result<T, StepParseError> {
        token.parse().map_err(|_| StepParseError::InvalidNumber {
            step: self.step,
            token: token.to_string(),
        })
    }

    fn finish(mut self) -> Result<(), StepParseError> {
        match self.tokens.next() {
            Some(token) => Err(StepParseError::UnexpectedArgument {
                step: self.step,
                token: token.to_string(),
            }),
            None => Ok(()),
        }
    }
}

/// Canonical spelling of a step name, for error messages.
fn canonical(name: &str) -> Option<&'static str> {
    const NAMES: &[&str] = &[
        "rotate",
        "scale",
        "nearest-scale",
        "bilinear-scale",
        "box-scale",
        "thumbnail-scale",
        "flip-x",
        "flip-y",
        "crop",
        "auto-crop",
        "resize",
        "resolution",
        "colorspace",
        "invert",
        "normalize",
        "bcg",
        "hsl",
    ];
    NAMES.iter().copied().find(|n| *n == name)
}

impl FromStr for Step {
    type Err = StepParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut tokens = s.split_whitespace();
        let name = tokens.next().ok_or(StepParseError::Empty)?.to_ascii_lowercase();
        let step = canonical(&name).ok_or_else(|| StepParseError::Unknown(name.clone()))?;
        let mut args = Args { step, tokens };

        let parsed = if let Some(&(_, filter)) = SCALE_NAMES.iter().find(|(n, _)| *n == step) {
            Step::Scale {
                filter,
                fx: args.number("factor")?,
                fy: args.optional()?,
            }
        } else {
            match step {
                "rotate" => Step::Rotate(args.number("angle")?),
                "flip-x" => Step::FlipX,
                "flip-y" => Step::FlipY,
                "crop" => Step::Crop {
                    x: args.number("x")?,
                    y: args.number("y")?,
                    width: args.number("width")?,
                    height: args.number("height")?,
                },
                "auto-crop" => Step::AutoCrop,
                "resize" => Step::Resize {
                    width: args.number("width")?,
                    height: args.number("height")?,
                },
                "resolution" => Step::Resolution {
                    x: args.number("dpi")?,
                    y: args.optional()?,
                },
                "colorspace" => {
                    let name = args.next_token("name")?;
                    Step::Colorspace(
                        name.parse()
                            .map_err(|_| StepParseError::UnknownColorspace(name.to_string()))?,
                    )
                }
                "invert" => Step::Invert,
                "normalize" => Step::Normalize,
                "bcg" => Step::BrightnessContrastGamma {
                    brightness: args.number("brightness")?,
                    contrast: args.number("contrast")?,
                    gamma: args.number("gamma")?,
                },
                "hsl" => Step::HueSaturationLightness {
                    hue: args.number("hue")?,
                    saturation: args.number("saturation")?,
                    lightness: args.number("lightness")?,
                },
                other => return Err(StepParseError::Unknown(other.to_string())),
            }
        };
        args.finish()?;
        Ok(parsed)
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::Rotate(angle) => write!(f, "rotate {angle}"),
            Step::Scale { filter, fx, fy } => {
                let name = SCALE_NAMES
                    .iter()
                    .find(|(_, fl)| fl == filter)
                    .map(|(n, _)| *n)
                    .unwrap_or("scale");
                write!(f, "{name} {fx}")?;
                if let Some(fy) = fy {
                    write!(f, " {fy}")?;
                }
                Ok(())
            }
            Step::FlipX => f.write_str("flip-x"),
            Step::FlipY => f.write_str("flip-y"),
            Step::Crop {
                x,
                y,
                width,
                height,
            } => write!(f, "crop {x} {y} {width} {height}"),
            Step::AutoCrop => f.write_str("auto-crop"),
            Step::Resize { width, height } => write!(f, "resize {width} {height}"),
            Step::Resolution { x, y: Some(y) } => write!(f, "resolution {x} {y}"),
            Step::Resolution { x, y: None } => write!(f, "resolution {x}"),
            Step::Colorspace(cs) => write!(f, "colorspace {cs}"),
            Step::Invert => f.write_str("invert"),
            Step::Normalize => f.write_str("normalize"),
            Step::BrightnessContrastGamma {
                brightness,
                contrast,
                gamma,
            } => write!(f, "bcg {brightness} {contrast} {gamma}"),
            Step::HueSaturationLightness {
                hue,
                saturation,
                lightness,
            } => write!(f, "hsl {hue} {saturation} {lightness}"),
        }
    }
}

impl TryFrom<String> for Step {
    type Error = StepParseError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Step> for String {
    fn from(step: Step) -> Self {
        step.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(s: &str) -> Step {
        s.parse().unwrap()
    }

    // =========================================================================
    // parsing
    // =========================================================================

    #[test]
    fn parse_rotate() {
        assert_eq!(parse("rotate 90"), Step::Rotate(90.0));
        assert_eq!(parse("  ROTATE   -12.5 "), Step::Rotate(-12.5));
    }

    #[test]
    fn parse_scale_variants() {
        assert_eq!(
            parse("scale 4"),
            Step::Scale {
                filter: ScaleFilter::Best,
                fx: 4.0,
                fy: None
            }
        );
        assert_eq!(
            parse("box-scale 0.5 0.25"),
            Step::Scale {
                filter: ScaleFilter::Box,
                fx: 0.5,
                fy: Some(0.25)
            }
        );
        assert!(matches!(
            parse("thumbnail-scale 0.1"),
            Step::Scale {
                filter: ScaleFilter::Thumbnail,
                ..
            }
        ));
    }

    #[test]
    fn parse_geometry_steps() {
        assert_eq!(
            parse("crop 1 2 30 40"),
            Step::Crop {
                x: 1,
                y: 2,
                width: 30,
                height: 40
            }
        );
        assert_eq!(
            parse("resize 100 50"),
            Step::Resize {
                width: 100,
                height: 50
            }
        );
        assert_eq!(parse("flip-x"), Step::FlipX);
        assert_eq!(parse("auto-crop"), Step::AutoCrop);
    }

    #[test]
    fn parse_resolution_with_optional_y() {
        assert_eq!(parse("resolution 300"), Step::Resolution { x: 300, y: None });
        assert_eq!(
            parse("resolution 300 150"),
            Step::Resolution {
                x: 300,
                y: Some(150)
            }
        );
    }

    #[test]
    fn parse_colorspace() {
        assert_eq!(parse("colorspace gray"), Step::Colorspace(Colorspace::Gray8));
        assert_eq!(
            "colorspace cmyk".parse::<Step>(),
            Err(StepParseError::UnknownColorspace("cmyk".into()))
        );
    }

    #[test]
    fn parse_errors_name_the_problem() {
        assert_eq!("".parse::<Step>(), Err(StepParseError::Empty));
        assert_eq!(
            "blur 3".parse::<Step>(),
            Err(StepParseError::Unknown("blur".into()))
        );
        assert_eq!(
            "rotate".parse::<Step>(),
            Err(StepParseError::MissingArgument {
                step: "rotate",
                argument: "angle"
            })
        );
        assert_eq!(
            "scale fast".parse::<Step>(),
            Err(StepParseError::InvalidNumber {
                step: "scale",
                token: "fast".into()
            })
        );
        assert_eq!(
            "invert now".parse::<Step>(),
            Err(StepParseError::UnexpectedArgument {
                step: "invert",
                token: "now".into()
            })
        );
        assert!("crop 1 2 -3 4".parse::<Step>().is_err());
    }

    #[test]
    fn display_parses_back() {
        for text in [
            "rotate 45",
            "nearest-scale 2 3",
            "crop 0 0 10 10",
            "resolution 72",
            "colorspace rgba16",
            "bcg 0.1 -0.2 1.5",
            "hsl 180 0 0.25",
        ] {
            assert_eq!(parse(text).to_string(), text);
        }
    }

    #[test]
    fn steps_deserialize_from_toml_strings() {
        #[derive(Deserialize)]
        struct Wrapper {
            steps: Vec<Step>,
        }
        let w: Wrapper = toml::from_str(r#"steps = ["rotate 90", "scale 0.5"]"#).unwrap();
        assert_eq!(w.steps.len(), 2);
        assert!(toml::from_str::<Wrapper>(r#"steps = ["warp 3"]"#).is_err());
    }

    // =========================================================================
    // applying
    // =========================================================================

    #[test]
    fn apply_runs_in_order() {
        let mut image = Image::blank(20, 10);
        image.set_resolution(100, 50);
        let steps = [parse("rotate 90"), parse("scale 2"), parse("resolution 300")];
        apply_all(&steps, &mut image, Color::BLACK).unwrap();
        assert_eq!((image.width(), image.height()), (20, 40));
        assert_eq!(image.resolution(), (300, 300));
    }

    #[test]
    fn apply_propagates_imaging_errors() {
        let mut image = Image::blank(4, 4);
        let err = parse("crop 10 10 1 1").apply(&mut image, Color::BLACK);
        assert!(matches!(err, Err(ImagingError::InvalidArgument(_))));
    }

    #[test]
    fn apply_colorspace_and_tone() {
        let mut image = Image::blank(4, 4);
        parse("invert").apply(&mut image, Color::BLACK).unwrap();
        parse("colorspace gray16").apply(&mut image, Color::BLACK).unwrap();
        assert_eq!(image.colorspace(), Colorspace::Gray16);
        assert_eq!(image.pixel(0, 0).unwrap(), Color::WHITE);
    }
}
