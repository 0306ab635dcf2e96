use std::{
    fs,
    path::{Path, PathBuf},
};

use serde::Deserialize;

use crate::BatchError;

/// Built-in upload table, in upload order: (collection, source file).
const BUILTIN_COLLECTIONS: &[(&str, &str)] = &[
    // Base catalogs
    ("ports", "puertos.json"),
    ("airports", "aeropuertos.json"),
    ("providers", "proveedores.json"),
    ("unidades_medida", "unidades.json"),
    ("countries", "paises.json"),
    ("cobertura_ciudades", "ciudades_cobertura_ecuador.json"),
    // International rates
    ("tarifario_fcl", "tarifario_FCL_07012026.json"),
    ("tarifario_lcl", "tarifario_LCL_07012026.json"),
    ("tarifario_aereo", "tarifario_AEREO_07012026.json"),
    // Inland logistics and legal
    ("tarifario_transporte_interno", "tarifario_transporte_interno.json"),
    ("seguridad_candado_custodia", "seguridad_candado_custodia.json"),
    ("condiciones_legales", "condiciones_legales_terrestre.json"),
    ("incoterms", "incoterms.json"),
    // Customs
    ("hs_codes", "partidas_estrategicas_unificadas.json"),
    ("hs_codes_comunes", "hs_codes_comunes.json"),
    ("ad_valorem_referencial", "ad_valorem_referencial.json"),
    ("impuesto_ice", "impuesto_ice.json"),
    ("locales_destino_fcl_navieras", "locales_destino_fcl_navieras.json"),
];

const BUILTIN_CONFIG_FILES: &[&str] = &["configuracion_sistema.json", "constantes_sistema.json"];

/// One entry of the upload table.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CollectionSource {
    pub collection: String,
    pub file: PathBuf,
}

/// What a run uploads, and in which order.
///
/// Collections are uploaded first, in table order, then configuration files.
/// A TOML file can replace the built-in table:
///
/// ```toml
/// chunk_size = 400
/// transactional = false
/// config_files = ["configuracion_sistema.json"]
///
/// [[collections]]
/// collection = "ports"
/// file = "puertos.json"
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub collections: Vec<CollectionSource>,
    #[serde(default)]
    pub config_files: Vec<PathBuf>,
    pub chunk_size: Option<usize>,
    pub transactional: Option<bool>,
}

impl Default for Manifest {
    fn default() -> Self {
        Self {
            collections: BUILTIN_COLLECTIONS
                .iter()
                .map(|(collection, file)| CollectionSource {
                    collection: collection.to_string(),
                    file: PathBuf::from(file),
                })
                .collect(),
            config_files: BUILTIN_CONFIG_FILES.iter().map(PathBuf::from).collect(),
            chunk_size: None,
            transactional: None,
        }
    }
}

impl Manifest {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, BatchError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(BatchError::MissingFile(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)
            .map_err(|error| BatchError::ItemReader(format!("{}: {}", path.display(), error)))?;

        Self::from_toml(&content)
            .map_err(|error| BatchError::Configuration(format!("{}: {}", path.display(), error)))
    }

    pub fn from_toml(content: &str) -> Result<Self, BatchError> {
        let manifest: Manifest =
            toml::from_str(content).map_err(|error| BatchError::Configuration(error.to_string()))?;

        if let Some(source) = manifest
            .collections
            .iter()
            .find(|source| source.collection.trim().is_empty())
        {
            return Err(BatchError::Configuration(format!(
                "empty collection name for '{}'",
                source.file.display()
            )));
        }

        Ok(manifest)
    }

    /// Makes relative file paths relative to `base_dir`.
    pub fn resolve(mut self, base_dir: &Path) -> Self {
        for source in &mut self.collections {
            source.file = base_dir.join(&source.file);
        }
        for file in &mut self.config_files {
            *file = base_dir.join(&*file);
        }
        self
    }
}
