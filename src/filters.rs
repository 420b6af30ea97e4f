//! Audio effect settings forwarded verbatim to the node with the `filters` op.
//!
//! Every field is optional, unset filters are left out of the payload so the
//! node keeps its defaults for them.

use serde::{Serialize, Deserialize};

/// Number of equalizer bands supported by the node (0-14).
pub const EQUALIZER_BANDS: u8 = 15;

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Filters {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volume: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub equalizer: Option<Vec<Band>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub karaoke: Option<Karaoke>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timescale: Option<Timescale>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tremolo: Option<Tremolo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vibrato: Option<Vibrato>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rotation: Option<Rotation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distortion: Option<Distortion>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel_mix: Option<ChannelMix>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub low_pass: Option<LowPass>,
}

impl Filters {
    /// Sets all equalizer levels.
    ///
    /// The floating point value is the multiplier for the given band. The default value is 0.
    /// Valid values range from -0.25 to 1.0, where -0.25 means the given band is completely muted, and 0.25 means it is doubled.
    pub fn equalize_all(&mut self, bands: [f64; 15]) -> &mut Self {
        self.equalizer = Some(bands.iter().enumerate().map(|(index, gain)| Band {
            band: index as u8,
            gain: *gain,
        }).collect());
        self
    }

    /// Equalizes a specific band, replacing its previous gain.
    pub fn equalize_band(&mut self, band: Band) -> &mut Self {
        let bands = self.equalizer.get_or_insert_with(Vec::new);

        match bands.iter_mut().find(|b| b.band == band.band) {
            Some(existing) => existing.gain = band.gain,
            None => bands.push(band),
        }

        self
    }

    /// Resets all equalizer levels.
    pub fn equalize_reset(&mut self) -> &mut Self {
        self.equalizer = Some((0..EQUALIZER_BANDS).map(|band| Band { band, gain: 0. }).collect());
        self
    }

    pub fn clear(&mut self) -> &mut Self {
        *self = Self::default();
        self
    }
}

#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Band {
    pub band: u8,
    pub gain: f64,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Karaoke {
    pub level: f64,
    pub mono_level: f64,
    pub filter_band: f64,
    pub filter_width: f64,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Timescale {
    pub speed: f64,
    pub pitch: f64,
    pub rate: f64,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Tremolo {
    pub frequency: f64,
    pub depth: f64,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Vibrato {
    pub frequency: f64,
    pub depth: f64,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Rotation {
    pub rotation_hz: f64,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Distortion {
    pub sin_offset: f64,
    pub sin_scale: f64,
    pub cos_offset: f64,
    pub cos_scale: f64,
    pub tan_offset: f64,
    pub tan_scale: f64,
    pub offset: f64,
    pub scale: f64,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelMix {
    pub left_to_left: f64,
    pub left_to_right: f64,
    pub right_to_left: f64,
    pub right_to_right: f64,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct LowPass {
    pub smoothing: f64,
}
