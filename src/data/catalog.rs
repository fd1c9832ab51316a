use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use log::{debug, info};
use serde::Deserialize;

use super::loader::load_table;
use super::model::{CategoryTable, RockCategory, SiteId, SiteTables};
use crate::config::{CatalogMode, RunConfig, TABLE_EXTENSIONS};
use crate::error::InputError;

/// The three table files of one site, indexed by [`RockCategory::index`].
#[derive(Debug, Clone, PartialEq)]
pub struct SiteFiles {
    pub site: SiteId,
    pub files: [PathBuf; 3],
}

/// One row of an explicit `file,site,category` manifest.
#[derive(Debug, Deserialize)]
struct ManifestRow {
    file: PathBuf,
    site: String,
    category: String,
}

// ---------------------------------------------------------------------------
// Discovery
// ---------------------------------------------------------------------------

/// List the point tables directly inside `dir`, sorted by file name.
pub fn discover_tables(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir).with_context(|| format!("listing {}", dir.display()))? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let path = entry.path();
        if has_table_extension(&path) {
            files.push(path);
        } else {
            debug!("Skipping {}", path.display());
        }
    }
    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}

fn has_table_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| TABLE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

fn check_file_count(count: usize) -> Result<(), InputError> {
    if count == 0 || count % 3 != 0 {
        return Err(InputError::FileCount(count));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Pairing files with (site, category)
// ---------------------------------------------------------------------------

/// Pair every input table with its site and rock category.
pub fn catalog_sites(config: &RunConfig) -> Result<Vec<SiteFiles>> {
    let sites = match (config.mode, &config.manifest) {
        (CatalogMode::Manifest, Some(manifest)) => from_manifest(manifest, &config.input_dir)?,
        (CatalogMode::Manifest, None) => bail!("manifest mode requires a manifest file"),
        (CatalogMode::Tagged, _) => tagged(&discover_tables(&config.input_dir)?)?,
        (CatalogMode::Ordinal, _) => ordinal(&discover_tables(&config.input_dir)?)?,
    };
    info!("Catalogued {} sites ({:?} mode)", sites.len(), config.mode);
    Ok(sites)
}

/// Legacy pairing by sorted position: `i / 3` is the site and
/// `i % 3` the category in Carbonate, Felsic, Mafic order.
pub fn ordinal(files: &[PathBuf]) -> Result<Vec<SiteFiles>, InputError> {
    check_file_count(files.len())?;
    Ok(files
        .chunks_exact(3)
        .enumerate()
        .map(|(i, chunk)| SiteFiles {
            site: SiteId {
                number: i + 1,
                label: format!("{}", i + 1),
            },
            files: [chunk[0].clone(), chunk[1].clone(), chunk[2].clone()],
        })
        .collect())
}

/// Pair files by the site label and category token in their names,
/// e.g. `site01_carbonate.csv` or `Andes-Mafic.parquet`.
pub fn tagged(files: &[PathBuf]) -> Result<Vec<SiteFiles>, InputError> {
    check_file_count(files.len())?;
    let mut assembler = SiteAssembler::default();
    for path in files {
        let (label, category) =
            parse_file_tag(path).ok_or_else(|| InputError::UntaggedFile(path.clone()))?;
        assembler.add(label, category, path.clone())?;
    }
    assembler.finish()
}

/// Split a file stem into tokens and pull out the single category token.
/// The remaining tokens, joined by `_`, form the site label.
fn parse_file_tag(path: &Path) -> Option<(String, RockCategory)> {
    let stem = path.file_stem()?.to_str()?;
    let mut category = None;
    let mut label = Vec::new();

    for token in stem.split(|c: char| !c.is_ascii_alphanumeric()).filter(|t| !t.is_empty()) {
        match RockCategory::from_token(token) {
            Some(found) if category.is_none() => category = Some(found),
            Some(_) => return None,
            None => label.push(token),
        }
    }

    let label = if label.is_empty() {
        "site".to_string()
    } else {
        label.join("_")
    };
    category.map(|c| (label, c))
}

fn from_manifest(manifest: &Path, input_dir: &Path) -> Result<Vec<SiteFiles>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(manifest)
        .with_context(|| format!("opening manifest {}", manifest.display()))?;

    let mut rows = Vec::new();
    for (i, result) in reader.deserialize::<ManifestRow>().enumerate() {
        rows.push(result.with_context(|| format!("manifest row {}", i + 1))?);
    }
    check_file_count(rows.len())?;

    let mut assembler = SiteAssembler::default();
    for row in rows {
        let category: RockCategory = row.category.parse()?;
        let file = if row.file.is_absolute() {
            row.file
        } else {
            input_dir.join(row.file)
        };
        assembler.add(row.site, category, file)?;
    }
    Ok(assembler.finish()?)
}

/// Collects (label, category, file) triples; sites keep first-seen order.
#[derive(Default)]
struct SiteAssembler {
    order: Vec<(String, [Option<PathBuf>; 3])>,
    index: HashMap<String, usize>,
}

impl SiteAssembler {
    fn add(&mut self, label: String, category: RockCategory, file: PathBuf) -> Result<(), InputError> {
        let slot = match self.index.get(&label) {
            Some(&i) => i,
            None => {
                self.index.insert(label.clone(), self.order.len());
                self.order.push((label.clone(), [None, None, None]));
                self.order.len() - 1
            }
        };

        let entry = &mut self.order[slot].1[category.index()];
        if entry.is_some() {
            return Err(InputError::DuplicateCategory {
                site: label,
                category,
            });
        }
        *entry = Some(file);
        Ok(())
    }

    fn finish(self) -> Result<Vec<SiteFiles>, InputError> {
        self.order
            .into_iter()
            .enumerate()
            .map(|(i, (label, [carbonate, felsic, mafic]))| -> Result<SiteFiles, InputError> {
                let missing = |category: RockCategory| InputError::MissingCategory {
                    site: label.clone(),
                    category,
                };
                let files = [
                    carbonate.ok_or_else(|| missing(RockCategory::Carbonate))?,
                    felsic.ok_or_else(|| missing(RockCategory::Felsic))?,
                    mafic.ok_or_else(|| missing(RockCategory::Mafic))?,
                ];
                Ok(SiteFiles {
                    site: SiteId {
                        number: i + 1,
                        label: label.clone(),
                    },
                    files,
                })
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// Load the three tables of every catalogued site. Any failure aborts.
pub fn load_sites(catalog: &[SiteFiles]) -> Result<Vec<SiteTables>> {
    catalog
        .iter()
        .map(|entry| -> Result<SiteTables> {
            let load = |category: RockCategory| -> Result<CategoryTable> {
                let source = entry.files[category.index()].clone();
                let records = load_table(&source)?;
                Ok(CategoryTable {
                    category,
                    source,
                    records,
                })
            };
            Ok(SiteTables {
                site: entry.site.clone(),
                tables: [
                    load(RockCategory::Carbonate)?,
                    load(RockCategory::Felsic)?,
                    load(RockCategory::Mafic)?,
                ],
            })
        })
        .collect()
}
