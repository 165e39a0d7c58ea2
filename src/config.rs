//! Environment-driven configuration: port, data directory, embedding
//! provider credentials, and default index parameters.

use std::env;

use crate::index::ivf::IvfParams;
use crate::index::nsw::NswParams;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub data_dir: String,
    pub embedding_provider_url: Option<String>,
    pub embedding_provider_token: Option<String>,
    pub embedding_dim: usize,
    pub ivf_params: IvfParams,
    pub nsw_params: NswParams,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8080,
            data_dir: "./data".to_string(),
            embedding_provider_url: None,
            embedding_provider_token: None,
            embedding_dim: 128,
            ivf_params: IvfParams::default(),
            nsw_params: NswParams::default(),
        }
    }
}

impl Config {
    /// Reads configuration from the environment, falling back to defaults.
    /// Returns a descriptive error on malformed numeric values rather than
    /// silently using the default, so a typo'd env var fails fast at boot.
    pub fn from_env() -> anyhow::Result<Self> {
        let mut cfg = Config::default();

        if let Ok(port) = env::var("PORT") {
            cfg.port = port
                .parse()
                .map_err(|e| anyhow::anyhow!("invalid PORT '{port}': {e}"))?;
        }
        if let Ok(dir) = env::var("DATA_DIR") {
            cfg.data_dir = dir;
        }
        cfg.embedding_provider_url = env::var("EMBEDDING_PROVIDER_URL").ok();
        cfg.embedding_provider_token = env::var("EMBEDDING_PROVIDER_TOKEN").ok();
        if let Ok(dim) = env::var("EMBEDDING_DIM") {
            cfg.embedding_dim = dim
                .parse()
                .map_err(|e| anyhow::anyhow!("invalid EMBEDDING_DIM '{dim}': {e}"))?;
        }

        if let Ok(kc) = env::var("IVF_KC") {
            cfg.ivf_params.k_c = Some(
                kc.parse()
                    .map_err(|e| anyhow::anyhow!("invalid IVF_KC '{kc}': {e}"))?,
            );
        }
        if let Ok(np) = env::var("IVF_NPROBE") {
            cfg.ivf_params.n_probe = Some(
                np.parse()
                    .map_err(|e| anyhow::anyhow!("invalid IVF_NPROBE '{np}': {e}"))?,
            );
        }
        if let Ok(m) = env::var("NSW_M") {
            cfg.nsw_params.m = m
                .parse()
                .map_err(|e| anyhow::anyhow!("invalid NSW_M '{m}': {e}"))?;
        }
        if let Ok(efc) = env::var("NSW_EF_CONSTRUCTION") {
            cfg.nsw_params.ef_construction = efc
                .parse()
                .map_err(|e| anyhow::anyhow!("invalid NSW_EF_CONSTRUCTION '{efc}': {e}"))?;
        }
        if let Ok(efs) = env::var("NSW_EF_SEARCH") {
            cfg.nsw_params.ef_search = Some(
                efs.parse()
                    .map_err(|e| anyhow::anyhow!("invalid NSW_EF_SEARCH '{efs}': {e}"))?,
            );
        }

        Ok(cfg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let cfg = Config::default();
        assert_eq!(cfg.port, 8080);
        assert_eq!(cfg.data_dir, "./data");
        assert!(cfg.embedding_provider_url.is_none());
    }
}
