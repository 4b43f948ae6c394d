//! Scoring surface decode
//!
//! A scoring surface is a 2-D raster that maps a hit location (UV in the
//! unit square) to a point value. Two encodings are supported: a value
//! channel read at the nearest texel with a neighbor-probe fallback for
//! sparse encodings, and a palette table matched against a bilinear color
//! sample. Out-of-range UV is an expected miss, never a panic.

/// Regulation sector order, clockwise from the top of the board.
pub const SECTOR_VALUES: [u8; 20] = [
    20, 1, 18, 4, 13, 6, 10, 15, 2, 17, 3, 19, 7, 16, 8, 11, 14, 9, 12, 5,
];

// Ring radii as fractions of the playing radius.
const BULL_R: f32 = 0.037;
const OUTER_BULL_R: f32 = 0.094;
const TREBLE_INNER_R: f32 = 0.582;
const TREBLE_OUTER_R: f32 = 0.629;
const DOUBLE_INNER_R: f32 = 0.953;

/// Half-width in texels of the zero-valued wire lines baked into the
/// generated board. Wide enough to appear in the raster, narrow enough for
/// a radius-1 neighbor probe to recover the adjacent bed value.
const WIRE_HALF_WIDTH: f32 = 0.7;

#[derive(Debug, Clone)]
enum SurfaceData {
    /// One value texel per sample, 0 meaning "no score here".
    Values(Vec<u8>),
    /// RGBA texels for palette-matched surfaces.
    Rgba(Vec<[u8; 4]>),
}

#[derive(Debug, Clone)]
pub struct ScoringSurface {
    width: u32,
    height: u32,
    data: SurfaceData,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PaletteEntry {
    pub color: [u8; 4],
    pub value: u8,
}

#[derive(Debug, Clone)]
pub enum DecodeMode {
    /// Nearest-texel read of the value channel; zero texels are re-probed
    /// over a (2R+1) x (2R+1) neighborhood and the maximum wins.
    EncodedChannel { probe_radius: u32 },
    /// Bilinear color sample matched against a table within a per-channel
    /// tolerance; first match wins, no match decodes as invalid.
    Palette {
        entries: Vec<PaletteEntry>,
        tolerance: u8,
    },
}

impl ScoringSurface {
    pub fn from_values(width: u32, height: u32, values: Vec<u8>) -> Option<Self> {
        if width == 0 || height == 0 || values.len() != (width * height) as usize {
            return None;
        }
        Some(Self {
            width,
            height,
            data: SurfaceData::Values(values),
        })
    }

    pub fn from_rgba(width: u32, height: u32, texels: Vec<[u8; 4]>) -> Option<Self> {
        if width == 0 || height == 0 || texels.len() != (width * height) as usize {
            return None;
        }
        Some(Self {
            width,
            height,
            data: SurfaceData::Rgba(texels),
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    fn value_at(&self, x: u32, y: u32) -> u8 {
        let idx = (y * self.width + x) as usize;
        match &self.data {
            SurfaceData::Values(values) => values[idx],
            // The value channel of a color surface is red.
            SurfaceData::Rgba(texels) => texels[idx][0],
        }
    }

    fn rgba_at(&self, x: u32, y: u32) -> [f32; 4] {
        let idx = (y * self.width + x) as usize;
        match &self.data {
            SurfaceData::Values(values) => {
                let v = values[idx] as f32;
                [v, v, v, 255.0]
            }
            SurfaceData::Rgba(texels) => {
                let t = texels[idx];
                [t[0] as f32, t[1] as f32, t[2] as f32, t[3] as f32]
            }
        }
    }

    fn bilinear(&self, u: f32, v: f32) -> [f32; 4] {
        let x = u * (self.width - 1) as f32;
        let y = v * (self.height - 1) as f32;
        let x0 = x.floor() as u32;
        let y0 = y.floor() as u32;
        let x1 = (x0 + 1).min(self.width - 1);
        let y1 = (y0 + 1).min(self.height - 1);
        let fx = x - x0 as f32;
        let fy = y - y0 as f32;

        let mut out = [0.0f32; 4];
        let c00 = self.rgba_at(x0, y0);
        let c10 = self.rgba_at(x1, y0);
        let c01 = self.rgba_at(x0, y1);
        let c11 = self.rgba_at(x1, y1);
        for ch in 0..4 {
            let top = c00[ch] + (c10[ch] - c00[ch]) * fx;
            let bottom = c01[ch] + (c11[ch] - c01[ch]) * fx;
            out[ch] = top + (bottom - top) * fy;
        }
        out
    }

    /// Generates a regulation dartboard raster: 20 sectors, treble and
    /// double bands, inner/outer bull, zero-valued sector wires. The value
    /// texel is the scored points (sector x multiplier, bulls 25/50).
    pub fn dartboard(size: u32) -> Self {
        let half = size as f32 / 2.0;
        let mut values = vec![0u8; (size * size) as usize];

        for y in 0..size {
            for x in 0..size {
                // Texel center in [-1, 1] with +ny pointing at sector 20.
                let nx = (x as f32 + 0.5 - half) / half;
                let ny = (y as f32 + 0.5 - half) / half;
                let r = (nx * nx + ny * ny).sqrt();
                values[(y * size + x) as usize] = Self::board_value(nx, ny, r, half);
            }
        }

        Self {
            width: size,
            height: size,
            data: SurfaceData::Values(values),
        }
    }

    fn board_value(nx: f32, ny: f32, r: f32, radius_px: f32) -> u8 {
        if r > 1.0 {
            return 0;
        }
        if r < BULL_R {
            return 50;
        }
        if r < OUTER_BULL_R {
            return 25;
        }

        // Angle clockwise from the top, sector boundaries at 9 + 18k deg.
        let deg = nx.atan2(ny).to_degrees();
        let from_first_boundary = (deg + 9.0).rem_euclid(360.0);

        // Sector wires score zero; the neighbor probe recovers the bed.
        let off = from_first_boundary.rem_euclid(18.0);
        let to_wire_deg = off.min(18.0 - off);
        if r * radius_px * to_wire_deg.to_radians().sin() < WIRE_HALF_WIDTH {
            return 0;
        }

        let sector = SECTOR_VALUES[(from_first_boundary / 18.0) as usize % 20];
        let multiplier = if (TREBLE_INNER_R..TREBLE_OUTER_R).contains(&r) {
            3
        } else if r >= DOUBLE_INNER_R {
            2
        } else {
            1
        };
        sector * multiplier
    }
}

fn uv_in_range(uv: (f32, f32)) -> bool {
    (0.0..=1.0).contains(&uv.0) && (0.0..=1.0).contains(&uv.1)
}

/// Decodes a point value from `surface` at `uv`. Returns None when the UV
/// falls outside the unit square or, in palette mode, when no table entry
/// matches the sampled color.
pub fn decode(surface: &ScoringSurface, uv: (f32, f32), mode: &DecodeMode) -> Option<u8> {
    if !uv_in_range(uv) {
        return None;
    }

    match mode {
        DecodeMode::EncodedChannel { probe_radius } => {
            let x = (uv.0 * (surface.width - 1) as f32).round() as u32;
            let y = (uv.1 * (surface.height - 1) as f32).round() as u32;
            let x = x.min(surface.width - 1);
            let y = y.min(surface.height - 1);

            let direct = surface.value_at(x, y);
            if direct != 0 || *probe_radius == 0 {
                return Some(direct);
            }
            Some(neighborhood_max(surface, x, y, *probe_radius))
        }
        DecodeMode::Palette { entries, tolerance } => {
            let sample = surface.bilinear(uv.0, uv.1);
            entries
                .iter()
                .find(|entry| {
                    entry
                        .color
                        .iter()
                        .zip(sample.iter())
                        .all(|(c, s)| (*c as f32 - s).abs() <= *tolerance as f32)
                })
                .map(|entry| entry.value)
        }
    }
}

fn neighborhood_max(surface: &ScoringSurface, x: u32, y: u32, radius: u32) -> u8 {
    let x_min = x.saturating_sub(radius);
    let y_min = y.saturating_sub(radius);
    let x_max = (x + radius).min(surface.width - 1);
    let y_max = (y + radius).min(surface.height - 1);

    let mut best = 0u8;
    for py in y_min..=y_max {
        for px in x_min..=x_max {
            best = best.max(surface.value_at(px, py));
        }
    }
    best
}
