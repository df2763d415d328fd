//! Catalog store — the product CSV file and its in-memory working copy
//!
//! The file is always handled whole: load everything, change the in-memory
//! [`Catalog`], write everything back. Rewrites use the atomic rename
//! pattern so a crash mid-write never leaves a truncated catalog:
//!
//! 1. Write header + rows to `<file>.tmp` in the same directory
//! 2. durable_sync the temp file
//! 3. Rename the temp file over the catalog (atomic on POSIX)
//! 4. Sync the directory
//!
//! There is no cross-process lock. Two sessions rewriting the same file
//! race and the last rewrite wins.

use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io::{BufReader, Write};
use std::path::{Path, PathBuf};

use hashbrown::HashMap;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{ShelfError, ShelfResult};
use crate::platform_durability::{durable_sync, sync_dir};
use crate::record::{CatalogRow, Product, CATALOG_HEADER};

/// File-backed catalog of products.
#[derive(Debug, Clone)]
pub struct CatalogStore {
    /// Catalog CSV file
    path: PathBuf,
    /// Sync appends and rewrites before returning
    durable: bool,
}

impl CatalogStore {
    /// Store over `path` with durable writes.
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            durable: true,
        }
    }

    /// Store described by `config`.
    pub fn from_config(config: &Config) -> Self {
        Self {
            path: config.catalog_path(),
            durable: config.durable_writes,
        }
    }

    /// Turn durable sync on or off.
    pub fn with_durability(mut self, durable: bool) -> Self {
        self.durable = durable;
        self
    }

    /// Catalog file path (for diagnostics)
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load every product in file order.
    ///
    /// A missing file is an empty catalog, not an error. A row missing one
    /// of the fixed columns fails the whole load.
    pub fn load_all(&self) -> ShelfResult<Vec<Product>> {
        let products: Vec<Product> = self
            .load_rows()?
            .into_iter()
            .map(Product::decode)
            .collect();
        debug!(
            target: "shelfstore::catalog",
            path = %self.path.display(),
            count = products.len(),
            "catalog loaded"
        );
        Ok(products)
    }

    /// Append one product at the end of the file.
    ///
    /// The header row goes first iff the file is absent or empty. The key is
    /// not checked for collisions; callers check against a loaded catalog.
    pub fn append_one(&self, product: &Product) -> ShelfResult<()> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| ShelfError::io(&self.path, "failed to open catalog for append", e))?;

        let needs_header = file
            .metadata()
            .map_err(|e| ShelfError::io(&self.path, "failed to stat catalog", e))?
            .len()
            == 0;

        let mut writer = row_writer(file);
        if needs_header {
            writer
                .write_record(CATALOG_HEADER)
                .map_err(|e| ShelfError::csv(&self.path, e))?;
        }
        writer
            .serialize(product.encode())
            .map_err(|e| ShelfError::csv(&self.path, e))?;

        let file = finish(writer, &self.path)?;
        if self.durable {
            durable_sync(&file)
                .map_err(|e| ShelfError::io(&self.path, "catalog durable_sync failed", e))?;
        }

        info!(
            target: "shelfstore::catalog",
            key = %product.key,
            header = needs_header,
            "product appended"
        );
        Ok(())
    }

    /// Rewrite the whole file: header plus one row per product, in order.
    pub fn replace_all(&self, products: &[Product]) -> ShelfResult<()> {
        let rows: Vec<CatalogRow> = products.iter().map(Product::encode).collect();
        self.write_rows_atomic(&rows)?;
        info!(target: "shelfstore::catalog", count = rows.len(), "catalog rewritten");
        Ok(())
    }

    /// Remove every row whose key equals `key` and rewrite the file.
    ///
    /// Surviving rows are written back exactly as they were read. The file
    /// is rewritten even when nothing matched. Returns the number of rows
    /// removed.
    pub fn delete_by_key(&self, key: &str) -> ShelfResult<usize> {
        let rows = self.load_rows()?;
        let before = rows.len();
        let kept: Vec<CatalogRow> = rows.into_iter().filter(|row| row.key != key).collect();
        let removed = before - kept.len();

        self.write_rows_atomic(&kept)?;

        if removed == 0 {
            warn!(target: "shelfstore::catalog", key, "delete matched no rows");
        } else {
            info!(target: "shelfstore::catalog", key, removed, "product deleted");
        }
        Ok(removed)
    }

    /// Raw rows, cells untouched.
    fn load_rows(&self) -> ShelfResult<Vec<CatalogRow>> {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(ShelfError::io(&self.path, "failed to open catalog", e)),
        };

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_reader(BufReader::new(file));

        reader
            .deserialize::<CatalogRow>()
            .map(|row| row.map_err(|e| ShelfError::csv(&self.path, e)))
            .collect()
    }

    fn write_rows_atomic(&self, rows: &[CatalogRow]) -> ShelfResult<()> {
        let tmp_path = temp_path(&self.path);

        let result = self.write_temp(&tmp_path, rows).and_then(|()| {
            fs::rename(&tmp_path, &self.path).map_err(|e| {
                ShelfError::io(&self.path, "failed to rename rewritten catalog into place", e)
            })
        });

        if let Err(e) = result {
            // The original file is untouched until the rename succeeds.
            let _ = fs::remove_file(&tmp_path);
            return Err(e);
        }

        if self.durable {
            if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
                sync_dir(parent)
                    .map_err(|e| ShelfError::io(parent, "failed to sync catalog directory", e))?;
            }
        }
        Ok(())
    }

    fn write_temp(&self, tmp_path: &Path, rows: &[CatalogRow]) -> ShelfResult<()> {
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(tmp_path)
            .map_err(|e| ShelfError::io(tmp_path, "failed to create temp catalog", e))?;

        let mut writer = row_writer(file);
        writer
            .write_record(CATALOG_HEADER)
            .map_err(|e| ShelfError::csv(tmp_path, e))?;
        for row in rows {
            writer.serialize(row).map_err(|e| ShelfError::csv(tmp_path, e))?;
        }

        let file = finish(writer, tmp_path)?;
        if self.durable {
            durable_sync(&file)
                .map_err(|e| ShelfError::io(tmp_path, "temp catalog durable_sync failed", e))?;
        }
        Ok(())
    }
}

/// CSV writer that never emits headers on its own; callers decide.
pub(crate) fn row_writer<W: Write>(inner: W) -> csv::Writer<W> {
    csv::WriterBuilder::new()
        .has_headers(false)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(inner)
}

/// Flush the writer and hand back the file.
pub(crate) fn finish(writer: csv::Writer<File>, path: &Path) -> ShelfResult<File> {
    writer.into_inner().map_err(|e| {
        let err = e.error();
        let io_err = std::io::Error::new(err.kind(), err.to_string());
        ShelfError::io(path, "failed to flush rows", io_err)
    })
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name: OsString = path.file_name().map(OsString::from).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// In-memory working copy of the catalog: key → product, in file order.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    products: Vec<Product>,
    index: HashMap<String, usize>,
}

impl Catalog {
    /// Build from loaded products. A key seen twice keeps its first
    /// position and its last value.
    pub fn from_products(products: Vec<Product>) -> Self {
        let mut catalog = Self::default();
        for product in products {
            if let Some(previous) = catalog.insert(product) {
                warn!(
                    target: "shelfstore::catalog",
                    key = %previous.key,
                    "duplicate key in catalog file, later row wins"
                );
            }
        }
        catalog
    }

    /// Look up a product by key.
    pub fn get(&self, key: &str) -> Option<&Product> {
        self.index.get(key).map(|&i| &self.products[i])
    }

    /// Mutable lookup by key.
    pub fn get_mut(&mut self, key: &str) -> Option<&mut Product> {
        match self.index.get(key) {
            Some(&i) => Some(&mut self.products[i]),
            None => None,
        }
    }

    /// True if `key` is in the catalog.
    pub fn contains_key(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    /// Insert or replace. A replaced product keeps its position and the
    /// old value is returned.
    pub fn insert(&mut self, product: Product) -> Option<Product> {
        if let Some(&i) = self.index.get(&product.key) {
            return Some(std::mem::replace(&mut self.products[i], product));
        }
        self.index.insert(product.key.clone(), self.products.len());
        self.products.push(product);
        None
    }

    /// Remove by key, keeping the order of the rest.
    pub fn remove(&mut self, key: &str) -> Option<Product> {
        let i = self.index.remove(key)?;
        let removed = self.products.remove(i);
        for slot in self.index.values_mut() {
            if *slot > i {
                *slot -= 1;
            }
        }
        Some(removed)
    }

    /// Keys in catalog order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.products.iter().map(|p| p.key.as_str())
    }

    /// Products in catalog order.
    pub fn products(&self) -> &[Product] {
        &self.products
    }

    /// The last `n` products in catalog order.
    pub fn recent(&self, n: usize) -> &[Product] {
        let start = self.products.len().saturating_sub(n);
        &self.products[start..]
    }

    /// Number of products.
    pub fn len(&self) -> usize {
        self.products.len()
    }

    /// Returns true if the catalog has no products.
    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }
}
