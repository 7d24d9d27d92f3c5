use std::collections::{HashMap, HashSet, VecDeque};

use eframe::egui::{Color32, Vec2};

pub const ROOT_ID: &str = "root";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Root,
    Project,
    Document,
    Category,
}

impl NodeKind {
    pub fn label(self) -> &'static str {
        match self {
            Self::Root => "root",
            Self::Project => "project",
            Self::Document => "document",
            Self::Category => "category",
        }
    }

    pub fn default_color(self) -> Color32 {
        match self {
            Self::Root => Color32::from_rgb(126, 94, 60),
            Self::Project => Color32::from_rgb(96, 165, 120),
            Self::Document => Color32::from_rgb(104, 160, 222),
            Self::Category => Color32::from_rgb(226, 178, 92),
        }
    }

    pub const fn default_val(self) -> f32 {
        match self {
            Self::Root => 14.0,
            Self::Project => 9.0,
            Self::Document => 6.0,
            Self::Category => 7.0,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum IconKind {
    Seed,
    Tree,
    Hub,
    Folder,
    Document,
    Sparkle,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Node {
    pub id: String,
    pub name: String,
    pub kind: NodeKind,
    pub val: f32,
    pub color: Color32,
    pub icon: IconKind,
    pub level: u32,
    pub collapsed: bool,
    pub bias: Option<Vec2>,
    pub description: Option<String>,
    pub document_id: Option<String>,
}

impl Node {
    pub fn new(id: impl Into<String>, name: impl Into<String>, kind: NodeKind, level: u32) -> Self {
        let icon = match kind {
            NodeKind::Root => IconKind::Hub,
            NodeKind::Project => IconKind::Folder,
            NodeKind::Document => IconKind::Document,
            NodeKind::Category => IconKind::Sparkle,
        };

        Self {
            id: id.into(),
            name: name.into(),
            kind,
            val: kind.default_val(),
            color: kind.default_color(),
            icon,
            level,
            collapsed: false,
            bias: None,
            description: None,
            document_id: None,
        }
    }

    pub fn is_root(&self) -> bool {
        self.id == ROOT_ID
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Link {
    pub source: String,
    pub target: String,
    pub weight: f32,
}

impl Link {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            weight: 1.0,
        }
    }

    pub fn touches(&self, id: &str) -> bool {
        self.source == id || self.target == id
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct NodePatch {
    pub name: Option<String>,
    pub color: Option<Color32>,
    pub icon: Option<IconKind>,
    pub collapsed: Option<bool>,
    pub val: Option<f32>,
    pub bias: Option<Option<Vec2>>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct VisibleGraph {
    pub nodes: Vec<Node>,
    pub links: Vec<Link>,
}

impl VisibleGraph {
    pub fn contains(&self, id: &str) -> bool {
        self.nodes.iter().any(|node| node.id == id)
    }

    pub fn node_ids(&self) -> HashSet<&str> {
        self.nodes.iter().map(|node| node.id.as_str()).collect()
    }
}

/// Breadth-first walk from `root`; a node's children are enqueued only while
/// the node itself is expanded. Links to missing ids are ignored.
pub fn compute_visible(
    nodes: &[Node],
    links: &[Link],
    collapsed_by_id: &HashMap<String, bool>,
) -> VisibleGraph {
    let by_id = nodes
        .iter()
        .map(|node| (node.id.as_str(), node))
        .collect::<HashMap<_, _>>();
    let Some(root) = by_id.get(ROOT_ID) else {
        return VisibleGraph::default();
    };

    let mut children: HashMap<&str, Vec<&str>> = HashMap::new();
    for link in links {
        if by_id.contains_key(link.source.as_str()) && by_id.contains_key(link.target.as_str()) {
            children
                .entry(link.source.as_str())
                .or_default()
                .push(link.target.as_str());
        }
    }

    let mut visible_ids = HashSet::new();
    let mut order = Vec::new();
    let mut queue = VecDeque::new();
    visible_ids.insert(root.id.as_str());
    queue.push_back(root.id.as_str());

    while let Some(current) = queue.pop_front() {
        order.push(current);
        if collapsed_by_id.get(current).copied().unwrap_or(false) {
            continue;
        }

        let Some(targets) = children.get(current) else {
            continue;
        };
        for &target in targets {
            if visible_ids.insert(target) {
                queue.push_back(target);
            }
        }
    }

    let visible_nodes = order
        .iter()
        .filter_map(|id| by_id.get(id).map(|node| (*node).clone()))
        .collect::<Vec<_>>();
    let visible_links = links
        .iter()
        .filter(|link| {
            visible_ids.contains(link.source.as_str()) && visible_ids.contains(link.target.as_str())
        })
        .cloned()
        .collect::<Vec<_>>();

    VisibleGraph {
        nodes: visible_nodes,
        links: visible_links,
    }
}

#[derive(Clone, Debug, Default)]
pub struct MindMap {
    pub nodes: Vec<Node>,
    pub links: Vec<Link>,
}

impl MindMap {
    pub fn new_seed() -> Self {
        let mut root = Node::new(ROOT_ID, "My garden", NodeKind::Root, 0);
        root.icon = IconKind::Seed;
        root.val = SEED_ROOT_VAL;
        root.color = Color32::from_rgb(150, 112, 70);

        Self {
            nodes: vec![root],
            links: Vec::new(),
        }
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|node| node.id == id)
    }

    fn node_mut(&mut self, id: &str) -> Option<&mut Node> {
        self.nodes.iter_mut().find(|node| node.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.node(id).is_some()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn children_of(&self, id: &str) -> Vec<&str> {
        self.links
            .iter()
            .filter(|link| link.source == id)
            .map(|link| link.target.as_str())
            .collect()
    }

    pub fn has_children(&self, id: &str) -> bool {
        self.links.iter().any(|link| link.source == id)
    }

    pub fn parent_of(&self, id: &str) -> Option<&str> {
        self.links
            .iter()
            .find(|link| link.target == id)
            .map(|link| link.source.as_str())
    }

    pub fn depth_of(&self, id: &str) -> Option<u32> {
        if !self.contains(id) {
            return None;
        }

        let mut depth = 0;
        let mut current = id;
        while current != ROOT_ID {
            current = self.parent_of(current)?;
            depth += 1;
            if depth as usize > self.nodes.len() {
                return None;
            }
        }
        Some(depth)
    }

    pub fn collapsed_by_id(&self) -> HashMap<String, bool> {
        self.nodes
            .iter()
            .map(|node| (node.id.clone(), node.collapsed))
            .collect()
    }

    pub fn visible(&self) -> VisibleGraph {
        compute_visible(&self.nodes, &self.links, &self.collapsed_by_id())
    }

    /// Appends a batch under `parent_id` and expands the parent so the batch
    /// shows up. Nodes whose id is already taken are skipped, but links from
    /// them to new nodes still attach. New nodes that never reach the existing
    /// tree are dropped. Returns the number of nodes added.
    pub fn add_subtree(&mut self, parent_id: &str, new_nodes: Vec<Node>, new_links: Vec<Link>) -> usize {
        if !self.contains(parent_id) {
            return 0;
        }

        let existing = self
            .nodes
            .iter()
            .map(|node| node.id.clone())
            .collect::<HashSet<_>>();
        let mut added = HashSet::new();
        for node in new_nodes {
            if !existing.contains(&node.id) && added.insert(node.id.clone()) {
                self.nodes.push(node);
            }
        }

        let mut pending = new_links
            .into_iter()
            .filter(|link| added.contains(&link.target) && link.source != link.target)
            .collect::<Vec<_>>();
        let mut attached = HashSet::new();
        loop {
            let before = attached.len();
            pending.retain(|link| {
                if attached.contains(&link.target) {
                    return false;
                }
                if existing.contains(&link.source) || attached.contains(&link.source) {
                    attached.insert(link.target.clone());
                    self.links.push(link.clone());
                    return false;
                }
                true
            });
            if attached.len() == before {
                break;
            }
        }
        self.nodes
            .retain(|node| !added.contains(&node.id) || attached.contains(&node.id));

        if let Some(parent) = self.node_mut(parent_id) {
            parent.collapsed = false;
        }

        attached.len()
    }

    pub fn add_child(&mut self, parent_id: &str, name: &str, kind: NodeKind, bias: Option<Vec2>) -> Option<String> {
        let parent_level = self.node(parent_id)?.level;

        let mut ordinal = self.children_of(parent_id).len() + 1;
        let mut id = format!("{parent_id}-idea-{ordinal}");
        while self.contains(&id) {
            ordinal += 1;
            id = format!("{parent_id}-idea-{ordinal}");
        }

        let mut child = Node::new(id.clone(), name, kind, parent_level + 1);
        child.bias = bias;
        self.add_subtree(parent_id, vec![child], vec![Link::new(parent_id, id.clone())]);
        Some(id)
    }

    pub fn delete_subtree(&mut self, node_id: &str) -> bool {
        if node_id == ROOT_ID || !self.contains(node_id) {
            return false;
        }

        let mut doomed = HashSet::new();
        let mut stack = vec![node_id.to_owned()];
        while let Some(current) = stack.pop() {
            if !doomed.insert(current.clone()) {
                continue;
            }
            for link in &self.links {
                if link.source == current {
                    stack.push(link.target.clone());
                }
            }
        }

        self.nodes.retain(|node| !doomed.contains(&node.id));
        self.links
            .retain(|link| !doomed.contains(&link.source) && !doomed.contains(&link.target));
        true
    }

    pub fn update_node(&mut self, node_id: &str, patch: NodePatch) -> bool {
        let Some(node) = self.node_mut(node_id) else {
            return false;
        };

        if let Some(name) = patch.name {
            node.name = name;
        }
        if let Some(color) = patch.color {
            node.color = color;
        }
        if let Some(icon) = patch.icon {
            node.icon = icon;
        }
        if let Some(collapsed) = patch.collapsed {
            node.collapsed = collapsed;
        }
        if let Some(val) = patch.val {
            node.val = val;
        }
        if let Some(bias) = patch.bias {
            node.bias = bias;
        }
        true
    }

    pub fn prune_dangling(&mut self) -> usize {
        let known = self
            .nodes
            .iter()
            .map(|node| node.id.as_str())
            .collect::<HashSet<_>>();
        let before = self.links.len();
        let kept = self
            .links
            .iter()
            .filter(|link| known.contains(link.source.as_str()) && known.contains(link.target.as_str()))
            .cloned()
            .collect::<Vec<_>>();
        self.links = kept;
        before - self.links.len()
    }

    pub fn is_seed(&self) -> bool {
        self.node(ROOT_ID)
            .is_some_and(|root| root.icon == IconKind::Seed)
    }
}

pub const SEED_ROOT_VAL: f32 = 6.0;
pub const TREE_ROOT_VAL: f32 = NodeKind::Root.default_val();
