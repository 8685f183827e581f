//! Per-package configuration records stored under `_c:<package>`.

use crate::error::{NetabaseError, NetabaseResult};
use crate::traits::model::Model;
use crate::traits::store::{KvStore, ReadOnlyKvStore};

use super::bucket::validate_name;

const CONFIG_PREFIX: &str = "_c:";

pub fn config_key(package: &str) -> Vec<u8> {
    format!("{CONFIG_PREFIX}{package}").into_bytes()
}

/// Validate and store the configuration of `package`, replacing any
/// previous one.
pub fn save_config<S, C>(db: &mut S, package: &str, conf: &C) -> NetabaseResult<()>
where
    S: KvStore + ?Sized,
    C: Model + ?Sized,
{
    validate_name(package)?;
    conf.validate().map_err(NetabaseError::validation)?;
    db.set(&config_key(package), &conf.marshal()?)
}

/// Load the configuration of `package`. Fails with `NotFound` if none was
/// stored.
pub fn load_config<S, C>(db: &S, package: &str) -> NetabaseResult<C>
where
    S: ReadOnlyKvStore + ?Sized,
    C: Model + Default,
{
    let raw = db
        .get(&config_key(package))?
        .ok_or_else(|| NetabaseError::NotFound(format!("configuration of package {package}")))?;
    let mut conf = C::default();
    conf.unmarshal(&raw)?;
    Ok(conf)
}
