//! In-memory object tree and its on-disk metadata encoding.
//!
//! Groups and datasets are nodes in an arena; the root group is node 0.
//! The tree is written as one block of v2 object headers in pre-order,
//! root first, so each header's address is known before any link to it is
//! encoded. Loading walks hard links from the root header.

use std::collections::HashSet;

use asdf_format::data_layout::DataLayout;
use asdf_format::fill_value::FillValueMessage;
use asdf_format::link_info::{GroupInfoMessage, LinkInfoMessage};
use asdf_format::link_message::{LinkMessage, LinkTarget};
use asdf_format::object_header::MAX_PREFIX_LEN;
use asdf_format::object_header_writer::MSG_FLAG_CONSTANT;
use asdf_format::{
    AttributeMessage, Dataspace, Datatype, FormatError, MessageType, ObjectHeader,
    ObjectHeaderWriter, LENGTH_SIZE, OFFSET_SIZE,
};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::error::{Error, Result};
use crate::path::components;
use crate::storage::Storage;

pub(crate) type NodeId = usize;

pub(crate) const ROOT: NodeId = 0;

/// Element type, shape and storage of a dataset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct DatasetInfo {
    pub(crate) datatype: Datatype,
    pub(crate) dataspace: Dataspace,
    pub(crate) layout: DataLayout,
}

impl DatasetInfo {
    /// One-dimensional contiguous dataset of `extent` elements at `address`.
    pub(crate) fn contiguous(datatype: Datatype, extent: u64, address: Option<u64>) -> Self {
        let size = extent.saturating_mul(datatype.type_size() as u64);
        DatasetInfo {
            datatype,
            dataspace: Dataspace::simple(&[extent]),
            layout: DataLayout::Contiguous { address, size },
        }
    }

    pub(crate) fn extent(&self) -> u64 {
        self.dataspace.num_elements()
    }

    pub(crate) fn dims(&self) -> Vec<u64> {
        match self.dataspace.rank() {
            0 => vec![self.extent()],
            _ => self.dataspace.dims.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) enum NodeKind {
    Group { children: Vec<NodeId> },
    Dataset(DatasetInfo),
}

#[derive(Debug, Clone)]
pub(crate) struct Node {
    pub(crate) name: String,
    pub(crate) parent: Option<NodeId>,
    pub(crate) attrs: Vec<AttributeMessage>,
    pub(crate) kind: NodeKind,
}

#[derive(Debug, Clone)]
pub(crate) struct Tree {
    nodes: Vec<Node>,
}

impl Tree {
    /// A tree holding only an empty root group.
    pub(crate) fn new() -> Self {
        Tree {
            nodes: vec![Node {
                name: String::new(),
                parent: None,
                attrs: Vec::new(),
                kind: NodeKind::Group {
                    children: Vec::new(),
                },
            }],
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.nodes.len()
    }

    pub(crate) fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id]
    }

    pub(crate) fn dataset(&self, id: NodeId) -> Option<&DatasetInfo> {
        match &self.nodes[id].kind {
            NodeKind::Dataset(info) => Some(info),
            NodeKind::Group { .. } => None,
        }
    }

    pub(crate) fn is_group(&self, id: NodeId) -> bool {
        matches!(self.nodes[id].kind, NodeKind::Group { .. })
    }

    pub(crate) fn children(&self, id: NodeId) -> &[NodeId] {
        match &self.nodes[id].kind {
            NodeKind::Group { children } => children,
            NodeKind::Dataset(_) => &[],
        }
    }

    pub(crate) fn child(&self, parent: NodeId, name: &str) -> Option<NodeId> {
        self.children(parent)
            .iter()
            .copied()
            .find(|&c| self.nodes[c].name == name)
    }

    /// Node at `path`, or `None` when some link along it is missing or
    /// passes through a dataset.
    pub(crate) fn resolve(&self, path: &str) -> Result<Option<NodeId>> {
        let mut current = ROOT;
        for name in components(path)? {
            if !self.is_group(current) {
                return Ok(None);
            }
            match self.child(current, name) {
                Some(next) => current = next,
                None => return Ok(None),
            }
        }
        Ok(Some(current))
    }

    /// Absolute path of a node.
    pub(crate) fn path_of(&self, id: NodeId) -> String {
        let mut names = Vec::new();
        let mut current = Some(id);
        while let Some(n) = current {
            let node = &self.nodes[n];
            if node.parent.is_some() {
                names.push(node.name.as_str());
            }
            current = node.parent;
        }
        names.reverse();
        format!("/{}", names.join("/"))
    }

    /// Fail unless a link called `name` can be added to `parent`.
    pub(crate) fn check_insert(&self, parent: NodeId, name: &str) -> Result<()> {
        if !self.is_group(parent) {
            return Err(Error::NotAGroup(self.path_of(parent)));
        }
        if self.child(parent, name).is_some() {
            return Err(Error::DuplicateName(name.to_string()));
        }
        Ok(())
    }

    fn insert(&mut self, parent: NodeId, name: &str, attrs: Vec<AttributeMessage>, kind: NodeKind) -> Result<NodeId> {
        self.check_insert(parent, name)?;
        let id = self.nodes.len();
        self.nodes.push(Node {
            name: name.to_string(),
            parent: Some(parent),
            attrs,
            kind,
        });
        if let NodeKind::Group { children } = &mut self.nodes[parent].kind {
            children.push(id);
        }
        Ok(id)
    }

    pub(crate) fn add_group(&mut self, parent: NodeId, name: &str) -> Result<NodeId> {
        let kind = NodeKind::Group {
            children: Vec::new(),
        };
        self.insert(parent, name, Vec::new(), kind)
    }

    pub(crate) fn add_dataset(
        &mut self,
        parent: NodeId,
        name: &str,
        info: DatasetInfo,
        attrs: Vec<AttributeMessage>,
    ) -> Result<NodeId> {
        self.insert(parent, name, attrs, NodeKind::Dataset(info))
    }

    pub(crate) fn attribute(&self, id: NodeId, name: &str) -> Option<&AttributeMessage> {
        self.nodes[id].attrs.iter().find(|a| a.name == name)
    }

    pub(crate) fn push_attribute(&mut self, id: NodeId, attr: AttributeMessage) -> Result<()> {
        if self.attribute(id, &attr.name).is_some() {
            return Err(Error::DuplicateName(attr.name));
        }
        self.nodes[id].attrs.push(attr);
        Ok(())
    }

    fn preorder(&self) -> Vec<NodeId> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut stack = vec![ROOT];
        while let Some(id) = stack.pop() {
            order.push(id);
            stack.extend(self.children(id).iter().rev());
        }
        order
    }

    fn encode_node(&self, id: NodeId, addresses: &[u64]) -> Result<Vec<u8>> {
        let node = &self.nodes[id];
        let mut w = ObjectHeaderWriter::new();
        match &node.kind {
            NodeKind::Group { children } => {
                w.add_message(MessageType::LinkInfo, LinkInfoMessage::compact().serialize(OFFSET_SIZE));
                w.add_message(MessageType::GroupInfo, GroupInfoMessage::default().serialize());
                for &child in children {
                    let link = LinkMessage::hard(&self.nodes[child].name, addresses[child]);
                    w.add_message(MessageType::Link, link.serialize(OFFSET_SIZE)?);
                }
            }
            NodeKind::Dataset(info) => {
                w.add_message_with_flags(MessageType::Datatype, info.datatype.serialize(), MSG_FLAG_CONSTANT);
                w.add_message(MessageType::Dataspace, info.dataspace.serialize(LENGTH_SIZE));
                w.add_message_with_flags(
                    MessageType::FillValue,
                    FillValueMessage::early_zero().serialize(),
                    MSG_FLAG_CONSTANT,
                );
                w.add_message(MessageType::DataLayout, info.layout.serialize(OFFSET_SIZE, LENGTH_SIZE)?);
            }
        }
        for attr in &node.attrs {
            w.add_message(MessageType::Attribute, attr.serialize(LENGTH_SIZE)?);
        }
        Ok(w.serialize()?)
    }

    /// Encode every node as a block that starts at address `base`.
    ///
    /// Returns the block and the root header's address. Header sizes do not
    /// depend on the addresses they contain, so a first pass with
    /// placeholder addresses fixes the layout.
    pub(crate) fn serialize(&self, base: u64) -> Result<(Vec<u8>, u64)> {
        let order = self.preorder();
        let placeholder = vec![0u64; self.nodes.len()];
        let mut addresses = vec![0u64; self.nodes.len()];
        let mut cursor = base;
        for &id in &order {
            addresses[id] = cursor;
            cursor += self.encode_node(id, &placeholder)?.len() as u64;
        }

        #[cfg(feature = "parallel")]
        let headers = order
            .par_iter()
            .map(|&id| self.encode_node(id, &addresses))
            .collect::<Result<Vec<_>>>()?;
        #[cfg(not(feature = "parallel"))]
        let headers = order
            .iter()
            .map(|&id| self.encode_node(id, &addresses))
            .collect::<Result<Vec<_>>>()?;

        let mut block = Vec::with_capacity((cursor - base) as usize);
        for header in headers {
            block.extend_from_slice(&header);
        }
        Ok((block, addresses[ROOT]))
    }

    /// Rebuild the tree from the headers reachable from `root_address`.
    ///
    /// Addresses are relative to `base`. Soft and external links are not
    /// followed.
    pub(crate) fn load(storage: &Storage, base: u64, root_address: u64, offset_size: u8, length_size: u8) -> Result<Tree> {
        let mut nodes: Vec<Node> = Vec::new();
        let mut visited = HashSet::new();
        let mut pending: Vec<(Option<NodeId>, String, u64)> = vec![(None, String::new(), root_address)];

        while let Some((parent, name, address)) = pending.pop() {
            if !visited.insert(address) {
                return Err(FormatError::UnsupportedFeature("object reachable by more than one hard link").into());
            }
            let header = read_header(storage, base, address)?;
            let mut attrs = Vec::new();
            for msg in header.find_all(MessageType::Attribute) {
                attrs.push(AttributeMessage::parse(&msg.data, length_size)?);
            }
            if let Some(info) = header.find(MessageType::AttributeInfo) {
                // flags(1) + version(1) + [max creation index(2)] + heap address
                let skip = if info.data.get(1).copied().unwrap_or(0) & 0x01 != 0 { 4 } else { 2 };
                let heap = info.data.get(skip..skip + offset_size as usize).unwrap_or(&[]);
                if heap.iter().any(|&b| b != 0xFF) {
                    return Err(FormatError::UnsupportedFeature("dense attribute storage").into());
                }
            }

            let id = nodes.len();
            let kind = if let Some(layout) = header.find(MessageType::DataLayout) {
                let datatype = header.find(MessageType::Datatype).ok_or(FormatError::UnsupportedFeature("dataset without datatype"))?;
                let dataspace = header.find(MessageType::Dataspace).ok_or(FormatError::UnsupportedFeature("dataset without dataspace"))?;
                NodeKind::Dataset(DatasetInfo {
                    datatype: Datatype::parse(&datatype.data)?.0,
                    dataspace: Dataspace::parse(&dataspace.data, length_size)?,
                    layout: DataLayout::parse(&layout.data, offset_size, length_size)?,
                })
            } else {
                if header.find(MessageType::SymbolTable).is_some() {
                    return Err(FormatError::UnsupportedFeature("symbol table groups").into());
                }
                if let Some(li) = header.find(MessageType::LinkInfo) {
                    if LinkInfoMessage::parse(&li.data, offset_size)?.is_dense() {
                        return Err(FormatError::UnsupportedFeature("dense link storage").into());
                    }
                }
                let mut links = Vec::new();
                for msg in header.find_all(MessageType::Link) {
                    let link = LinkMessage::parse(&msg.data, offset_size)?;
                    if let LinkTarget::Hard(target) = link.target {
                        links.push((link.name, target));
                    }
                }
                // reversed so the stack yields them in header order
                for (child_name, target) in links.into_iter().rev() {
                    pending.push((Some(id), child_name, target));
                }
                NodeKind::Group {
                    children: Vec::new(),
                }
            };

            match parent {
                Some(p) => {
                    if let NodeKind::Group { children } = &mut nodes[p].kind {
                        children.push(id);
                    }
                }
                None if !matches!(kind, NodeKind::Group { .. }) => {
                    return Err(FormatError::UnsupportedFeature("root object is not a group").into());
                }
                None => {}
            }
            nodes.push(Node { name, parent, attrs, kind });
        }
        Ok(Tree { nodes })
    }
}

fn read_header(storage: &Storage, base: u64, address: u64) -> Result<ObjectHeader> {
    let position = base.checked_add(address).ok_or(FormatError::UnexpectedEof {
        expected: usize::MAX,
        available: 0,
    })?;
    let prefix = storage.read_upto(position, MAX_PREFIX_LEN)?;
    let size = ObjectHeader::peek_size(&prefix)?;
    let mut buf = vec![0u8; size];
    storage.read_at(position, &mut buf)?;
    Ok(ObjectHeader::parse(&buf, 0)?)
}
