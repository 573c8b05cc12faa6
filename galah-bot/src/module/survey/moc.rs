///! Multi-order coverage maps (MOC) over the HEALPix nested scheme
///!
///! A MOC lists, per order, the nested pixel indices a survey has observed.
///! A position is covered when its pixel at some listed order is present.

use galah_common::SkyPosition;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::f64::consts::FRAC_2_PI;

/// Deepest order representable with 64-bit nested indices
pub const MAX_ORDER: u8 = 29;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Moc {
    cells: BTreeMap<u8, HashSet<u64>>,
}

impl Moc {
    pub fn empty() -> Self {
        Self::default()
    }

    /// All twelve base pixels
    pub fn full_sky() -> Self {
        Self::from_cells(0, 0..12)
    }

    pub fn from_cells(order: u8, cells: impl IntoIterator<Item = u64>) -> Self {
        let mut moc = Self::empty();
        moc.add_cells(order, cells);
        moc
    }

    pub fn add_cells(&mut self, order: u8, cells: impl IntoIterator<Item = u64>) {
        self.cells.entry(order).or_default().extend(cells);
    }

    /// Parse the JSON MOC serialization: `{"order": [ipix, ...], ...}`.
    ///
    /// Keys that are not orders (time dimensions, metadata) are ignored.
    pub fn from_json(body: &[u8]) -> Result<Self, serde_json::Error> {
        let raw: HashMap<String, serde_json::Value> = serde_json::from_slice(body)?;
        let mut moc = Self::empty();

        for (key, value) in raw {
            let Ok(order) = key.parse::<u8>() else {
                continue;
            };
            if order > MAX_ORDER {
                continue;
            }
            let cells: Vec<u64> = serde_json::from_value(value)?;
            moc.add_cells(order, cells);
        }

        Ok(moc)
    }

    pub fn is_empty(&self) -> bool {
        self.cells.values().all(|c| c.is_empty())
    }

    pub fn cell_count(&self) -> usize {
        self.cells.values().map(|c| c.len()).sum()
    }

    pub fn contains(&self, position: SkyPosition) -> bool {
        let theta = position.colatitude_rad();
        let phi = position.longitude_rad();

        self.cells
            .iter()
            .any(|(&order, cells)| cells.contains(&ang2pix_nest(order, theta, phi)))
    }
}

/// Nested HEALPix index of the pixel containing (theta, phi) at `order`.
///
/// `theta` is the colatitude and `phi` the longitude, both in radians.
pub fn ang2pix_nest(order: u8, theta: f64, phi: f64) -> u64 {
    let nside: i64 = 1 << order;
    let z = theta.cos();
    let za = z.abs();
    let tt = (phi * FRAC_2_PI).rem_euclid(4.0);

    let (face, ix, iy) = if za <= 2.0 / 3.0 {
        // Equatorial region
        let temp1 = nside as f64 * (0.5 + tt);
        let temp2 = nside as f64 * (z * 0.75);
        let jp = (temp1 - temp2) as i64;
        let jm = (temp1 + temp2) as i64;
        let ifp = jp >> order;
        let ifm = jm >> order;
        let face = if ifp == ifm {
            ifp | 4
        } else if ifp < ifm {
            ifp
        } else {
            ifm + 8
        };
        (face, jm & (nside - 1), nside - (jp & (nside - 1)) - 1)
    } else {
        // Polar caps
        let ntt = (tt as i64).min(3);
        let tp = tt - ntt as f64;
        let tmp = nside as f64 * (3.0 * (1.0 - za)).sqrt();
        let jp = ((tp * tmp) as i64).min(nside - 1);
        let jm = (((1.0 - tp) * tmp) as i64).min(nside - 1);
        if z >= 0.0 {
            (ntt, nside - jm - 1, nside - jp - 1)
        } else {
            (ntt + 8, jp, jm)
        }
    };

    ((face as u64) << (2 * order as u32)) + spread_bits(ix as u64) + (spread_bits(iy as u64) << 1)
}

/// Interleave zero bits: abcd → 0a0b0c0d
fn spread_bits(v: u64) -> u64 {
    let mut x = v & 0xFFFF_FFFF;
    x = (x | (x << 16)) & 0x0000_FFFF_0000_FFFF;
    x = (x | (x << 8)) & 0x00FF_00FF_00FF_00FF;
    x = (x | (x << 4)) & 0x0F0F_0F0F_0F0F_0F0F;
    x = (x | (x << 2)) & 0x3333_3333_3333_3333;
    x = (x | (x << 1)) & 0x5555_5555_5555_5555;
    x
}
