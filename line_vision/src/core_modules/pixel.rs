// THEORY (HSV Pixel):
// The `pixel` module is the most fundamental unit of the segmentation stage. It is
// a "dumb" data container for a single pixel expressed in hue/saturation/value
// space, plus the band test used to decide whether that pixel belongs to the line.
//
// Why HSV and not raw RGB?
// - The painted line is defined by being dark, not by a colour. Value (max channel)
//   isolates darkness directly, independent of the blue/green cast of the water.
// - Hue and saturation stay available for lines painted in a colour.
//
// Scales follow the 8-bit convention the thresholds were tuned with:
// - hue:        0..180 (degrees halved so it fits a byte)
// - saturation: 0..255 (chroma / value)
// - value:      0..255 (max of R, G, B)
//
// Key principles:
// 1) Single-pixel scope: nothing here reads neighbours. Blur and closing live in
//    the segmenter.
// 2) Cheap: integer max/min, one division for saturation and one for hue.

pub mod pixel {
    pub type Channel = u8;
    pub type Hue = u8;
    pub type Saturation = u8;
    pub type Value = u8;

    /// A single pixel in 8-bit HSV.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct HsvPixel {
        /// Hue on the 0..180 scale.
        pub hue: Hue,
        /// Saturation, 0..255.
        pub saturation: Saturation,
        /// Value (brightness), 0..255.
        pub value: Value,
    }

    impl HsvPixel {
        pub fn new(hue: Hue, saturation: Saturation, value: Value) -> Self {
            Self {
                hue,
                saturation,
                value,
            }
        }

        /// Converts an RGB triple to 8-bit HSV.
        pub fn from_rgb(red: Channel, green: Channel, blue: Channel) -> Self {
            let maximum_channel = red.max(green).max(blue);
            let minimum_channel = red.min(green).min(blue);
            let chroma = (maximum_channel - minimum_channel) as f32;

            let value = maximum_channel;
            if maximum_channel == 0 || chroma <= 0.0 {
                return Self::new(0, 0, value);
            }

            let saturation = (chroma * 255.0 / maximum_channel as f32).round() as Saturation;

            let (red, green, blue) = (red as f32, green as f32, blue as f32);
            let (base_difference, sector_offset) = if maximum_channel as f32 == red {
                (green - blue, 0.0)
            } else if maximum_channel as f32 == green {
                (blue - red, 2.0)
            } else {
                (red - green, 4.0)
            };

            let mut hue_degrees = (base_difference / chroma + sector_offset) * 60.0;
            if hue_degrees < 0.0 {
                hue_degrees += 360.0;
            }
            let hue = ((hue_degrees * 0.5).round() as u16 % 180) as Hue;

            Self::new(hue, saturation, value)
        }

        /// True when every channel lies inside the inclusive `[lower, upper]` band.
        #[inline]
        pub fn within(&self, lower: &[u8; 3], upper: &[u8; 3]) -> bool {
            (lower[0]..=upper[0]).contains(&self.hue)
                && (lower[1]..=upper[1]).contains(&self.saturation)
                && (lower[2]..=upper[2]).contains(&self.value)
        }
    }
}
