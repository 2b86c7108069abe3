use std::path::Path;
use std::sync::Arc;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use tessera_core::config::{DEFAULT_CHUNK_SIZE, MAX_CHUNK_SIZE, MIN_CHUNK_SIZE};
use tessera_core::{Pixel, Priority, Quality, Resolution};

use crate::error::GraphError;
use crate::operation::PixelOperation;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlendMode {
    #[default]
    Mix,
    Add,
    Multiply,
    Subtract,
}

/// Authored node types. Sources carry their own resolution; everything
/// else derives it from its inputs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NodeKind {
    Value {
        value: f32,
    },
    Rgb {
        color: Pixel,
    },
    Checker {
        width: u32,
        height: u32,
        #[serde(default = "default_cell_size")]
        cell: u32,
    },
    Gradient {
        width: u32,
        height: u32,
    },
    Mix {
        #[serde(default)]
        blend: BlendMode,
        #[serde(default = "default_factor")]
        factor: f32,
    },
    Invert,
    Brightness {
        #[serde(default)]
        offset: f32,
    },
    Blur {
        #[serde(default = "default_blur_radius")]
        radius: u32,
    },
    Composite,
    Viewer {
        #[serde(default = "default_true")]
        active: bool,
    },
    /// Caller-supplied operation; only available when building trees in code.
    #[serde(skip)]
    Custom(Arc<dyn PixelOperation>),
}

fn default_cell_size() -> u32 {
    8
}

fn default_factor() -> f32 {
    0.5
}

fn default_blur_radius() -> u32 {
    2
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    pub name: String,
    pub kind: NodeKind,
    #[serde(default)]
    pub muted: bool,
    #[serde(default)]
    pub show_preview: bool,
    /// Tier override for output nodes.
    #[serde(default)]
    pub priority: Option<Priority>,
}

impl Node {
    pub fn new(name: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            name: name.into(),
            kind,
            muted: false,
            show_preview: false,
            priority: None,
        }
    }

    pub fn muted(mut self) -> Self {
        self.muted = true;
        self
    }

    pub fn with_preview(mut self) -> Self {
        self.show_preview = true;
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = Some(priority);
        self
    }
}

/// Edge between an output of one node and an input of another, by name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub from: String,
    #[serde(default)]
    pub from_socket: usize,
    pub to: String,
    #[serde(default)]
    pub to_socket: usize,
}

/// User-authored compositing graph plus its render settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeTree {
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub links: Vec<Link>,
    #[serde(default)]
    pub render_quality: Quality,
    #[serde(default)]
    pub edit_quality: Quality,
    #[serde(default = "default_chunk_size")]
    pub chunk_size: u32,
    #[serde(default)]
    pub use_gpu: bool,
    #[serde(default = "default_render_size")]
    pub render_size: Resolution,
    #[serde(default = "default_view_transform")]
    pub view_transform: String,
    #[serde(default = "default_display_device")]
    pub display_device: String,
}

fn default_chunk_size() -> u32 {
    DEFAULT_CHUNK_SIZE
}

fn default_render_size() -> Resolution {
    Resolution::new(1920, 1080)
}

fn default_view_transform() -> String {
    "standard".into()
}

fn default_display_device() -> String {
    "sRGB".into()
}

impl Default for NodeTree {
    fn default() -> Self {
        Self {
            nodes: Vec::new(),
            links: Vec::new(),
            render_quality: Quality::default(),
            edit_quality: Quality::default(),
            chunk_size: default_chunk_size(),
            use_gpu: false,
            render_size: default_render_size(),
            view_transform: default_view_transform(),
            display_device: default_display_device(),
        }
    }
}

impl NodeTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_toml(toml_str: &str) -> Result<Self, GraphError> {
        let tree: Self = toml::from_str(toml_str)?;
        tree.validate()?;
        Ok(tree)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, GraphError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml(&content)
    }

    pub fn with_node(mut self, node: Node) -> Self {
        self.nodes.push(node);
        self
    }

    pub fn link(
        mut self,
        from: impl Into<String>,
        from_socket: usize,
        to: impl Into<String>,
        to_socket: usize,
    ) -> Self {
        self.links.push(Link {
            from: from.into(),
            from_socket,
            to: to.into(),
            to_socket,
        });
        self
    }

    pub fn with_render_size(mut self, width: u32, height: u32) -> Self {
        self.render_size = Resolution::new(width, height);
        self
    }

    pub fn with_chunk_size(mut self, chunk_size: u32) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    pub fn node(&self, name: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.name == name)
    }

    /// Nodes keyed by name, in authored order.
    pub fn index(&self) -> IndexMap<&str, &Node> {
        self.nodes.iter().map(|n| (n.name.as_str(), n)).collect()
    }

    /// Chunk size clamped into the supported range.
    pub fn effective_chunk_size(&self) -> u32 {
        self.chunk_size.clamp(MIN_CHUNK_SIZE, MAX_CHUNK_SIZE)
    }

    pub fn quality(&self, rendering: bool) -> Quality {
        if rendering {
            self.render_quality
        } else {
            self.edit_quality
        }
    }

    /// Node names must be unique; links are checked later, during translation.
    pub fn validate(&self) -> Result<(), GraphError> {
        let index = self.index();
        if index.len() != self.nodes.len() {
            let mut seen = std::collections::HashSet::new();
            let duplicate = self
                .nodes
                .iter()
                .find(|n| !seen.insert(n.name.as_str()))
                .map(|n| n.name.clone())
                .unwrap_or_default();
            return Err(GraphError::Tree(format!("duplicate node name '{duplicate}'")));
        }
        Ok(())
    }
}
