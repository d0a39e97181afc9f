//! Taxonomy store of the embedded backend.
//!
//! The taxonomy lives in its own directory, next to the index, as
//! `taxonomy.json`: the sorted list of every category path known to the
//! index. [`TaxonomyWriter`] maintains it at commit time; [`TaxonomyReader`]
//! is opened once per search call.

use std::path::{Path, PathBuf};

use cms_search_core::{Error, Result};

use crate::category::{Category, CategorySource, TaxonomyTree};

/// File name of the persisted taxonomy.
pub const TAXONOMY_FILE: &str = "taxonomy.json";

fn load_tree(dir: &Path) -> Result<TaxonomyTree> {
    let file = dir.join(TAXONOMY_FILE);
    if !file.exists() {
        return Ok(TaxonomyTree::new());
    }
    let text = std::fs::read_to_string(&file)?;
    Ok(serde_json::from_str(&text)?)
}

// ============================================================================
// TaxonomyReader
// ============================================================================

/// Read-only snapshot of the taxonomy, valid for one search call.
#[derive(Debug)]
pub struct TaxonomyReader {
    dir: PathBuf,
    tree: TaxonomyTree,
}

impl TaxonomyReader {
    /// Open the taxonomy stored in `dir`.
    ///
    /// A directory without a taxonomy file holds an empty taxonomy.
    pub fn open(dir: &Path) -> Result<Self> {
        if !dir.is_dir() {
            return Err(Error::search(format!(
                "taxonomy directory {} does not exist",
                dir.display()
            )));
        }
        let tree = load_tree(dir).map_err(|e| {
            Error::search_with_source(format!("Failed to read taxonomy in {}", dir.display()), e)
        })?;
        Ok(Self {
            dir: dir.to_path_buf(),
            tree,
        })
    }

    /// The category tree.
    pub fn tree(&self) -> &TaxonomyTree {
        &self.tree
    }

    /// Release the snapshot.
    pub fn close(self) -> Result<()> {
        log::trace!("Released taxonomy reader for {}", self.dir.display());
        Ok(())
    }
}

impl CategorySource for TaxonomyReader {
    fn contains(&self, category: &Category) -> bool {
        self.tree.contains(category)
    }

    fn children(&self, category: &Category) -> Vec<Category> {
        self.tree.children(category)
    }
}

// ============================================================================
// TaxonomyWriter
// ============================================================================

/// Accumulates categories and persists them on commit.
#[derive(Debug)]
pub struct TaxonomyWriter {
    dir: PathBuf,
    tree: TaxonomyTree,
    dirty: bool,
}

impl TaxonomyWriter {
    /// Open (creating if needed) the taxonomy directory.
    pub fn open(dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(dir)?;
        Ok(Self {
            dir: dir.to_path_buf(),
            tree: load_tree(dir)?,
            dirty: false,
        })
    }

    /// Record a category and its ancestors.
    pub fn add(&mut self, category: &Category) {
        if self.tree.insert(category) {
            self.dirty = true;
        }
    }

    /// Forget every category.
    pub fn clear(&mut self) {
        if !self.tree.is_empty() {
            self.tree = TaxonomyTree::new();
            self.dirty = true;
        }
    }

    /// Current tree, including uncommitted additions.
    pub fn tree(&self) -> &TaxonomyTree {
        &self.tree
    }

    /// Persist pending changes.
    ///
    /// The file is replaced atomically so concurrent readers see either the
    /// previous or the new taxonomy.
    pub fn commit(&mut self) -> Result<()> {
        if !self.dirty {
            return Ok(());
        }
        let json = serde_json::to_string_pretty(&self.tree)?;
        let tmp = self.dir.join(format!("{TAXONOMY_FILE}.tmp"));
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, self.dir.join(TAXONOMY_FILE))?;
        self.dirty = false;
        log::debug!(
            "Committed taxonomy with {} categories to {}",
            self.tree.len(),
            self.dir.display()
        );
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
