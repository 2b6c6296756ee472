//! B-tree secondary indexes and the per-table index manager.
//!
//! Each index is an ordered multimap from a column value to the set of
//! row ids carrying that value. Duplicate keys are supported: every key
//! slot owns a small list of row ids in insertion order.
//!
//! Insertion splits full nodes top-down on the way to the leaf, so the
//! recursion never has to walk back up. Deletion removes a row id from
//! its key slot and drops the slot when the list empties; non-root nodes
//! are allowed to underflow (see `refill_slot`).

use std::cmp::Ordering;

use ahash::AHashMap;
use smallvec::{SmallVec, smallvec};

use crate::value::{Value, compare_values};

/// Monotonically increasing row identifier, unique within one table.
pub type RowId = u64;

/// Default order for column indexes created by the manager.
pub const DEFAULT_INDEX_ORDER: usize = 32;

/// Row-id list for one key. Most keys carry a single row id.
type RowIds = SmallVec<[RowId; 2]>;

#[derive(Debug, Clone)]
struct Node {
    leaf: bool,
    keys: Vec<Value>,
    rows: Vec<RowIds>,
    children: Vec<Node>,
}

impl Node {
    fn new_leaf() -> Self {
        Node {
            leaf: true,
            keys: Vec::new(),
            rows: Vec::new(),
            children: Vec::new(),
        }
    }

    fn new_internal() -> Self {
        Node {
            leaf: false,
            keys: Vec::new(),
            rows: Vec::new(),
            children: Vec::new(),
        }
    }

    fn find(&self, key: &Value) -> Result<usize, usize> {
        self.keys.binary_search_by(|k| compare_values(k, key))
    }
}

/// Ordered multimap from key to row-id list, backing one column index.
#[derive(Debug, Clone)]
pub struct BTree {
    order: usize,
    root: Node,
    len: usize,
}

impl BTree {
    /// Creates a tree of the given order (maximum children per node).
    /// Orders below 3 are clamped to 3.
    pub fn new(order: usize) -> Self {
        BTree {
            order: order.max(3),
            root: Node::new_leaf(),
            len: 0,
        }
    }

    /// Maximum keys held by any node.
    pub fn max_keys(&self) -> usize {
        self.order - 1
    }

    /// Minimum keys for a non-root node after a clean insertion history.
    pub fn min_keys(&self) -> usize {
        (self.order - 1) / 2
    }

    /// Total number of (key, row id) entries.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn contains(&self, key: &Value) -> bool {
        !self.search(key).is_empty()
    }

    /// Inserts one (key, row id) entry. An existing key gains the row id
    /// at the end of its list.
    pub fn insert(&mut self, key: Value, row_id: RowId) {
        if self.root.keys.len() == self.max_keys() {
            let old_root = std::mem::replace(&mut self.root, Node::new_internal());
            self.root.children.push(old_root);
            split_child(&mut self.root, 0);
        }
        let max_keys = self.max_keys();
        insert_non_full(&mut self.root, key, row_id, max_keys);
        self.len += 1;
    }

    /// All row ids stored under `key`, in insertion order.
    pub fn search(&self, key: &Value) -> Vec<RowId> {
        search_node(&self.root, key)
    }

    /// Removes one (key, row id) entry. Returns whether it was present.
    pub fn delete(&mut self, key: &Value, row_id: RowId) -> bool {
        let deleted = delete_node(&mut self.root, key, row_id);
        if !self.root.leaf && self.root.keys.is_empty() && self.root.children.len() == 1 {
            self.root = self.root.children.remove(0);
        }
        if deleted {
            self.len -= 1;
        }
        deleted
    }

    /// All entries whose key lies in `[min, max]` (either bound optional,
    /// both inclusive), ordered by key ascending. Row ids under one key
    /// keep their insertion order.
    pub fn range_search(&self, min: Option<&Value>, max: Option<&Value>) -> Vec<(Value, RowId)> {
        let mut out = Vec::new();
        range_into(&self.root, min, max, &mut out);
        out
    }
}

fn insert_non_full(node: &mut Node, key: Value, row_id: RowId, max_keys: usize) {
    match node.find(&key) {
        // Key already present (leaf slot or internal separator): the row
        // id joins its list. Keeping separator hits here means a key that
        // was promoted by a split still collects all of its row ids in
        // one slot.
        Ok(i) => node.rows[i].push(row_id),
        Err(mut i) => {
            if node.leaf {
                node.keys.insert(i, key);
                node.rows.insert(i, smallvec![row_id]);
            } else {
                if node.children[i].keys.len() == max_keys {
                    split_child(node, i);
                    match compare_values(&key, &node.keys[i]) {
                        Ordering::Greater => i += 1,
                        Ordering::Equal => {
                            node.rows[i].push(row_id);
                            return;
                        }
                        Ordering::Less => {}
                    }
                }
                insert_non_full(&mut node.children[i], key, row_id, max_keys);
            }
        }
    }
}

/// Splits the full child at `index`, promoting its median entry into the
/// parent. The right sibling receives the keys above the median; an
/// internal child also hands over the corresponding children.
fn split_child(parent: &mut Node, index: usize) {
    let child = &mut parent.children[index];
    let mid = child.keys.len() / 2;

    let right_keys = child.keys.split_off(mid + 1);
    let right_rows = child.rows.split_off(mid + 1);
    let up_key = child.keys.pop().expect("split child is full");
    let up_rows = child.rows.pop().expect("keys and rows stay parallel");

    let mut right = Node {
        leaf: child.leaf,
        keys: right_keys,
        rows: right_rows,
        children: Vec::new(),
    };
    if !child.leaf {
        right.children = child.children.split_off(mid + 1);
    }

    parent.keys.insert(index, up_key);
    parent.rows.insert(index, up_rows);
    parent.children.insert(index + 1, right);
}

fn search_node(node: &Node, key: &Value) -> Vec<RowId> {
    match node.find(key) {
        Ok(i) => node.rows[i].to_vec(),
        Err(i) => {
            if node.leaf || node.children.is_empty() {
                Vec::new()
            } else {
                search_node(&node.children[i], key)
            }
        }
    }
}

fn delete_node(node: &mut Node, key: &Value, row_id: RowId) -> bool {
    match node.find(key) {
        Ok(i) => {
            let Some(pos) = node.rows[i].iter().position(|&r| r == row_id) else {
                return false;
            };
            node.rows[i].remove(pos);
            if node.rows[i].is_empty() {
                if node.leaf {
                    node.keys.remove(i);
                    node.rows.remove(i);
                } else {
                    refill_slot(node, i);
                }
            }
            true
        }
        Err(i) => {
            if node.leaf || node.children.is_empty() {
                false
            } else {
                delete_node(&mut node.children[i], key, row_id)
            }
        }
    }
}

/// Refills an emptied separator slot with its in-order predecessor (or
/// successor), so every internal node keeps one more child than keys.
/// The donating leaf may underflow below `min_keys`; underflow is
/// tolerated and repaired only by later splits.
fn refill_slot(node: &mut Node, i: usize) {
    if let Some((key, rows)) = pop_rightmost(&mut node.children[i]) {
        node.keys[i] = key;
        node.rows[i] = rows;
    } else if let Some((key, rows)) = pop_leftmost(&mut node.children[i + 1]) {
        node.keys[i] = key;
        node.rows[i] = rows;
    } else {
        // Both neighbouring subtrees are empty: drop the slot along with
        // one of the empty children.
        node.keys.remove(i);
        node.rows.remove(i);
        node.children.remove(i + 1);
    }
}

/// Removes and returns the largest entry of a subtree, or `None` when the
/// subtree holds no keys at all.
fn pop_rightmost(node: &mut Node) -> Option<(Value, RowIds)> {
    if node.leaf {
        let key = node.keys.pop()?;
        let rows = node.rows.pop().expect("keys and rows stay parallel");
        return Some((key, rows));
    }
    while let Some(last) = node.children.last_mut() {
        if let Some(entry) = pop_rightmost(last) {
            return Some(entry);
        }
        // Rightmost subtree is exhausted: discard it and promote this
        // node's last separator instead, keeping children == keys + 1.
        node.children.pop();
        if let Some(key) = node.keys.pop() {
            let rows = node.rows.pop().expect("keys and rows stay parallel");
            if node.children.is_empty() {
                node.leaf = true;
            }
            return Some((key, rows));
        }
    }
    // Every child and key is gone; the node degrades to an empty leaf.
    node.leaf = true;
    None
}

/// Mirror of [`pop_rightmost`] for the smallest entry.
fn pop_leftmost(node: &mut Node) -> Option<(Value, RowIds)> {
    if node.leaf {
        if node.keys.is_empty() {
            return None;
        }
        let key = node.keys.remove(0);
        let rows = node.rows.remove(0);
        return Some((key, rows));
    }
    while !node.children.is_empty() {
        if let Some(entry) = pop_leftmost(&mut node.children[0]) {
            return Some(entry);
        }
        node.children.remove(0);
        if !node.keys.is_empty() {
            let key = node.keys.remove(0);
            let rows = node.rows.remove(0);
            if node.children.is_empty() {
                node.leaf = true;
            }
            return Some((key, rows));
        }
    }
    node.leaf = true;
    None
}

fn range_into(
    node: &Node,
    min: Option<&Value>,
    max: Option<&Value>,
    out: &mut Vec<(Value, RowId)>,
) {
    let below_min = |k: &Value| min.is_some_and(|m| compare_values(k, m) == Ordering::Less);
    let above_max = |k: &Value| max.is_some_and(|m| compare_values(k, m) == Ordering::Greater);

    for i in 0..node.keys.len() {
        let key = &node.keys[i];
        // Child i holds keys at most equal to keys[i]; skip it when even
        // keys[i] falls below the lower bound.
        if !node.leaf && i < node.children.len() && !below_min(key) {
            range_into(&node.children[i], min, max, out);
        }
        if above_max(key) {
            return;
        }
        if !below_min(key) {
            for &row_id in &node.rows[i] {
                out.push((key.clone(), row_id));
            }
        }
    }
    if !node.leaf {
        if let Some(last) = node.children.last() {
            range_into(last, min, max, out);
        }
    }
}

/// Per-table collection of named column indexes.
///
/// The manager is passive: the owning table drives insert/delete on every
/// row mutation. Operations on columns without an index are no-ops.
#[derive(Debug, Default)]
pub struct IndexManager {
    indexes: AHashMap<String, BTree>,
}

impl IndexManager {
    pub fn new() -> Self {
        IndexManager::default()
    }

    /// Creates an index on a column, or returns the existing one.
    pub fn create_index(&mut self, column: &str) -> &mut BTree {
        self.indexes
            .entry(column.to_lowercase())
            .or_insert_with(|| BTree::new(DEFAULT_INDEX_ORDER))
    }

    pub fn drop_index(&mut self, column: &str) -> bool {
        self.indexes.remove(&column.to_lowercase()).is_some()
    }

    pub fn has_index(&self, column: &str) -> bool {
        self.indexes.contains_key(&column.to_lowercase())
    }

    pub fn get_index(&self, column: &str) -> Option<&BTree> {
        self.indexes.get(&column.to_lowercase())
    }

    /// Folded names of all indexed columns.
    pub fn list_indexes(&self) -> Vec<String> {
        self.indexes.keys().cloned().collect()
    }

    pub fn insert(&mut self, column: &str, key: Value, row_id: RowId) {
        if let Some(index) = self.indexes.get_mut(&column.to_lowercase()) {
            index.insert(key, row_id);
        }
    }

    pub fn delete(&mut self, column: &str, key: &Value, row_id: RowId) -> bool {
        match self.indexes.get_mut(&column.to_lowercase()) {
            Some(index) => index.delete(key, row_id),
            None => false,
        }
    }

    /// Row ids under `key` in the column's index, or `None` when the
    /// column has no index (callers fall back to a scan).
    pub fn search(&self, column: &str, key: &Value) -> Option<Vec<RowId>> {
        self.indexes
            .get(&column.to_lowercase())
            .map(|index| index.search(key))
    }

    pub fn clear(&mut self) {
        self.indexes.clear();
    }
}
