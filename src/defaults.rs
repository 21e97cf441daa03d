// Randomized first-run values.
//
// Everything here is generic over `rand::Rng` so tests can drive the
// generation with a seeded `StdRng`; `ConfigStore::initialize` plugs in
// `rand::rng()`.

use rand::Rng;

use crate::document::ConfigDocument;
use crate::error::ConfigResult;
use crate::schema::{RANDOMIZED_KEYS, RandomKind};

/// Hour of day as a zero-padded two-character string, "00" through "23".
pub fn schedule_hour<R: Rng>(rng: &mut R) -> String {
    format!("{:02}", rng.random_range(0..24))
}

/// Minute as a zero-padded two-character string, "00" through "59".
pub fn schedule_minute<R: Rng>(rng: &mut R) -> String {
    format!("{:02}", rng.random_range(0..60))
}

/// 128-bit random value as exactly 32 lowercase hexadecimal characters.
pub fn api_key<R: Rng>(rng: &mut R) -> String {
    format!("{:032x}", rng.random::<u128>())
}

/// Write fresh random values into the schema's randomized key locations.
/// Each schedule component is drawn independently.
pub fn apply<R: Rng>(doc: &mut ConfigDocument, rng: &mut R) -> ConfigResult<()> {
    for (section, key, kind) in RANDOMIZED_KEYS {
        let value = match kind {
            RandomKind::Hour => schedule_hour(rng),
            RandomKind::Minute => schedule_minute(rng),
            RandomKind::ApiKey => api_key(rng),
        };
        doc.set_key(section, key, &value)?;
    }
    Ok(())
}
