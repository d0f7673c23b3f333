//! Page-file node store.
//!
//! Every node is one fixed-size page addressed by its byte offset in the
//! file. There is no read cache: each `get` is exactly one seek and one
//! read, each `put` exactly one seek and one write. The position table
//! (offsets of live pages) and the free list are kept in memory and rebuilt
//! from the tree on open.

use std::collections::BTreeSet;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::config::TreeConfig;
use crate::constants::FILE_HEADER_SIZE;
use crate::errors::{RTreeError, RTreeResult};
use crate::node::{Node, NodeRef};
use crate::store::page::{decode_page, encode_page, FileHeader};
use crate::store::NodeStore;

#[derive(Debug)]
pub struct DiskStore {
    file: File,
    path: PathBuf,
    config: TreeConfig,
    page_bytes: u64,
    next_position: u64,
    free_pages: Vec<u64>,
    positions: BTreeSet<u64>,
}

impl DiskStore {
    /// Creates (or truncates) a page file. The store holds no pages until
    /// [`NodeStore::reset`] allocates the root.
    pub fn create(path: &Path, config: &TreeConfig) -> RTreeResult<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;
        log::debug!("Created page file at {:?}", path);

        Ok(Self {
            file,
            path: path.to_path_buf(),
            config: config.clone(),
            page_bytes: config.page_bytes() as u64,
            next_position: FILE_HEADER_SIZE,
            free_pages: Vec::new(),
            positions: BTreeSet::new(),
        })
    }

    /// Opens an existing page file, returning the store and the header it
    /// was opened from. Only pages reachable from the stored root are
    /// considered live; every other page slot goes on the free list.
    pub fn open(path: &Path) -> RTreeResult<(Self, FileHeader)> {
        let file = OpenOptions::new().read(true).write(true).open(path)?;
        let header = {
            let mut reader = &file;
            reader.seek(SeekFrom::Start(0))?;
            let mut buffer = vec![0u8; FILE_HEADER_SIZE as usize];
            reader.read_exact(&mut buffer)?;
            FileHeader::decode(&buffer)?
        };
        header.validate()?;

        let mut store = Self {
            file,
            path: path.to_path_buf(),
            config: header.config.clone(),
            page_bytes: header.config.page_bytes() as u64,
            next_position: header.next_position,
            free_pages: Vec::new(),
            positions: BTreeSet::new(),
        };
        store.rebuild_positions(header.root_offset)?;
        log::debug!(
            "Opened page file at {:?}: {} live pages, {} free",
            path,
            store.positions.len(),
            store.free_pages.len()
        );
        Ok((store, header))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn config(&self) -> &TreeConfig {
        &self.config
    }

    /// Encoded size of one page.
    pub fn page_bytes(&self) -> u64 {
        self.page_bytes
    }

    /// Offset at which the next appended page will be written.
    pub fn next_position(&self) -> u64 {
        self.next_position
    }

    /// Offsets of freed pages awaiting reuse.
    pub fn free_pages(&self) -> &[u64] {
        &self.free_pages
    }

    /// Walks the tree from `root` to repopulate the position table, then
    /// puts every unreachable page slot on the free list.
    fn rebuild_positions(&mut self, root: u64) -> RTreeResult<()> {
        let mut pending = vec![root];
        while let Some(offset) = pending.pop() {
            self.check_offset(offset)?;
            if !self.positions.insert(offset) {
                return Err(RTreeError::corrupted(format!(
                    "page {} is referenced more than once",
                    offset
                )));
            }
            let node = self.read_page(offset)?;
            if !node.is_leaf() {
                for branch in &node.branches {
                    match branch.child.as_node() {
                        Some(NodeRef::Disk(child)) => pending.push(child),
                        _ => {
                            return Err(RTreeError::corrupted(format!(
                                "internal page {} holds a non-disk child",
                                offset
                            )))
                        }
                    }
                }
            }
        }

        // pushed from the top down so that pops hand out the lowest offsets first
        let mut offset = self.next_position;
        while offset > FILE_HEADER_SIZE {
            offset -= self.page_bytes;
            if !self.positions.contains(&offset) {
                self.free_pages.push(offset);
            }
        }
        Ok(())
    }

    fn check_offset(&self, offset: u64) -> RTreeResult<()> {
        if offset < FILE_HEADER_SIZE
            || offset >= self.next_position
            || (offset - FILE_HEADER_SIZE) % self.page_bytes != 0
        {
            return Err(RTreeError::corrupted(format!(
                "page offset {} is outside the page area",
                offset
            )));
        }
        Ok(())
    }

    fn offset(&self, node: NodeRef) -> RTreeResult<u64> {
        match node {
            NodeRef::Disk(offset) => Ok(offset),
            other => Err(RTreeError::InvalidReference(format!(
                "{} does not belong to a disk store",
                other
            ))),
        }
    }

    fn live_offset(&self, node: NodeRef) -> RTreeResult<u64> {
        let offset = self.offset(node)?;
        if !self.positions.contains(&offset) {
            return Err(RTreeError::NotFound(format!("no live page at {}", node)));
        }
        Ok(offset)
    }

    /// Reads a single page (one seek + one read).
    fn read_page(&self, offset: u64) -> RTreeResult<Node> {
        let mut file = &self.file;
        file.seek(SeekFrom::Start(offset))?;
        let mut buffer = vec![0u8; self.page_bytes as usize];
        file.read_exact(&mut buffer)?;
        log::trace!("Read page at {}", offset);
        decode_page(&buffer, &self.config)
    }

    /// Writes a single page (one seek + one write).
    fn write_page(&self, offset: u64, node: &Node) -> RTreeResult<()> {
        let bytes = encode_page(node, &self.config)?;
        let mut file = &self.file;
        file.seek(SeekFrom::Start(offset))?;
        file.write_all(&bytes)?;
        log::trace!("Wrote page at {}", offset);
        Ok(())
    }

    fn write_header(&self, header: &FileHeader) -> RTreeResult<()> {
        let bytes = header.encode()?;
        let mut file = &self.file;
        file.seek(SeekFrom::Start(0))?;
        file.write_all(&bytes)?;
        Ok(())
    }
}

impl NodeStore for DiskStore {
    fn get(&self, node: NodeRef) -> RTreeResult<Node> {
        let offset = self.live_offset(node)?;
        self.read_page(offset)
    }

    fn put(&mut self, node: NodeRef, contents: &Node) -> RTreeResult<()> {
        let offset = self.live_offset(node)?;
        self.write_page(offset, contents)
    }

    fn allocate(&mut self, contents: &Node) -> RTreeResult<NodeRef> {
        let (offset, reused) = match self.free_pages.pop() {
            Some(offset) => (offset, true),
            None => (self.next_position, false),
        };
        if let Err(err) = self.write_page(offset, contents) {
            if reused {
                self.free_pages.push(offset);
            }
            return Err(err);
        }
        if !reused {
            self.next_position += self.page_bytes;
        }
        self.positions.insert(offset);
        log::trace!("Allocated page at {} (reused: {})", offset, reused);
        Ok(NodeRef::Disk(offset))
    }

    fn free(&mut self, node: NodeRef) -> RTreeResult<()> {
        let offset = self.live_offset(node)?;
        self.positions.remove(&offset);
        self.free_pages.push(offset);
        Ok(())
    }

    fn is_valid_child(&self, node: NodeRef) -> bool {
        self.live_offset(node).is_ok()
    }

    fn reset(&mut self, config: &TreeConfig) -> RTreeResult<NodeRef> {
        self.file.set_len(0)?;
        self.config = config.clone();
        self.page_bytes = config.page_bytes() as u64;
        self.next_position = FILE_HEADER_SIZE;
        self.free_pages.clear();
        self.positions.clear();

        let root = self.allocate(&Node::new(0))?;
        self.persist_root(root, 0, 0)?;
        Ok(root)
    }

    fn persist_root(&mut self, root: NodeRef, root_level: u32, entries: u64) -> RTreeResult<()> {
        let root_offset = self.live_offset(root)?;
        let header = FileHeader {
            root_offset,
            root_level,
            next_position: self.next_position,
            entry_count: entries,
            ..FileHeader::new(self.config.clone())
        };
        self.write_header(&header)
    }

    fn sync(&mut self) -> RTreeResult<()> {
        self.file.sync_all()?;
        Ok(())
    }

    fn node_count(&self) -> usize {
        self.positions.len()
    }
}
