//! On-disk page and file header formats.
//!
//! A page file is a fixed-size header followed by fixed-size pages, one node
//! per page. Each page holds the node level, the valid branch count and the
//! branch array padded with zeroed branches up to the larger of the two
//! capacities, so every page encodes to exactly
//! [`TreeConfig::page_bytes`] bytes. Encoding uses bincode's legacy
//! (fixed-width integer) configuration.

use serde::{Deserialize, Serialize};

use crate::config::TreeConfig;
use crate::constants::{FILE_HEADER_SIZE, MAGIC, VERSION};
use crate::errors::{RTreeError, RTreeResult};
use crate::node::{Branch, ChildRef, Node, NodeRef};
use crate::rect::Rect;

/// One branch as laid out in a page: `dimensions` minimums, then
/// `dimensions` maximums, then the child field.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct PageBranch {
    coords: Vec<f64>,
    child: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct PageImage {
    level: u32,
    count: u32,
    branches: Vec<PageBranch>,
}

/// Serializes `node` into a page of exactly `config.page_bytes()` bytes.
pub fn encode_page(node: &Node, config: &TreeConfig) -> RTreeResult<Vec<u8>> {
    let dimensions = config.dimensions();
    let slots = config.node_capacity().max(config.leaf_capacity());
    if node.len() > config.capacity(node.level) {
        return Err(RTreeError::InvalidOperation(format!(
            "node at level {} holds {} branches, capacity is {}",
            node.level,
            node.len(),
            config.capacity(node.level)
        )));
    }

    let mut branches = Vec::with_capacity(slots);
    for branch in &node.branches {
        let child = match branch.child {
            ChildRef::Record(id) if node.is_leaf() => id,
            ChildRef::Node(NodeRef::Disk(offset)) if !node.is_leaf() => offset,
            other => {
                return Err(RTreeError::InvalidReference(format!(
                    "{} cannot be stored in a level {} page",
                    other, node.level
                )))
            }
        };
        let mut coords = Vec::with_capacity(2 * dimensions);
        coords.extend_from_slice(branch.rect.min());
        coords.extend_from_slice(branch.rect.max());
        branches.push(PageBranch { coords, child });
    }
    branches.resize(
        slots,
        PageBranch {
            coords: vec![0.0; 2 * dimensions],
            child: 0,
        },
    );

    let image = PageImage {
        level: node.level,
        count: node.len() as u32,
        branches,
    };
    let bytes = bincode::serde::encode_to_vec(&image, bincode::config::legacy())?;
    if bytes.len() != config.page_bytes() {
        return Err(RTreeError::Serialization(format!(
            "page encoded to {} bytes, expected {}",
            bytes.len(),
            config.page_bytes()
        )));
    }
    Ok(bytes)
}

/// Decodes a page, rejecting anything inconsistent with `config`.
pub fn decode_page(bytes: &[u8], config: &TreeConfig) -> RTreeResult<Node> {
    let (image, _): (PageImage, usize) =
        bincode::serde::decode_from_slice(bytes, bincode::config::legacy())
            .map_err(|e| RTreeError::corrupted(format!("undecodable page: {}", e)))?;

    let count = image.count as usize;
    let capacity = config.capacity(image.level);
    if count > capacity || count > image.branches.len() {
        return Err(RTreeError::corrupted(format!(
            "page claims {} branches at level {}, capacity is {}",
            count, image.level, capacity
        )));
    }

    let dimensions = config.dimensions();
    let mut branches = Vec::with_capacity(count);
    for stored in image.branches.into_iter().take(count) {
        if stored.coords.len() != 2 * dimensions {
            return Err(RTreeError::corrupted(format!(
                "branch has {} coordinates, expected {}",
                stored.coords.len(),
                2 * dimensions
            )));
        }
        let (min, max) = stored.coords.split_at(dimensions);
        let rect = Rect::new(min.to_vec(), max.to_vec())
            .map_err(|e| RTreeError::corrupted(format!("bad branch rectangle: {}", e)))?;
        let child = if image.level == 0 {
            ChildRef::Record(stored.child)
        } else {
            ChildRef::Node(NodeRef::Disk(stored.child))
        };
        branches.push(Branch::new(rect, child));
    }
    Ok(Node::with_branches(image.level, branches))
}

/// File header stored at the beginning of the page file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileHeader {
    pub magic: u32,
    pub version: u32,
    pub config: TreeConfig,
    pub root_offset: u64,
    pub root_level: u32,
    pub next_position: u64,
    pub entry_count: u64,
}

impl FileHeader {
    pub fn new(config: TreeConfig) -> Self {
        Self {
            magic: MAGIC,
            version: VERSION,
            config,
            root_offset: FILE_HEADER_SIZE,
            root_level: 0,
            next_position: FILE_HEADER_SIZE,
            entry_count: 0,
        }
    }

    pub fn validate(&self) -> RTreeResult<()> {
        if self.magic != MAGIC {
            return Err(RTreeError::corrupted("Invalid file format (bad magic)"));
        }
        if self.version != VERSION {
            return Err(RTreeError::corrupted(format!(
                "Unsupported file format version {}",
                self.version
            )));
        }
        self.config.validate()
    }

    /// Encodes the header padded to [`FILE_HEADER_SIZE`] bytes.
    pub fn encode(&self) -> RTreeResult<Vec<u8>> {
        let mut bytes = bincode::serde::encode_to_vec(self, bincode::config::legacy())?;
        if bytes.len() > FILE_HEADER_SIZE as usize {
            return Err(RTreeError::Serialization(format!(
                "file header needs {} bytes, only {} reserved",
                bytes.len(),
                FILE_HEADER_SIZE
            )));
        }
        bytes.resize(FILE_HEADER_SIZE as usize, 0);
        Ok(bytes)
    }

    pub fn decode(bytes: &[u8]) -> RTreeResult<Self> {
        bincode::serde::decode_from_slice(bytes, bincode::config::legacy())
            .map(|(header, _)| header)
            .map_err(|e| RTreeError::corrupted(format!("undecodable file header: {}", e)))
    }
}
