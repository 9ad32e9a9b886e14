use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::route::segment::{classify_segment, RouterKind, Segment};

/// Convention files found in one App Router directory
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpecialFiles {
    pub page: Option<PathBuf>,
    pub route: Option<PathBuf>,
    pub layout: Option<PathBuf>,
    pub template: Option<PathBuf>,
    pub default: Option<PathBuf>,
    pub loading: Option<PathBuf>,
    pub error: Option<PathBuf>,
    pub not_found: Option<PathBuf>,
    pub forbidden: Option<PathBuf>,
    pub unauthorized: Option<PathBuf>,
    pub global_error: Option<PathBuf>,
}

impl SpecialFiles {
    fn slot(&mut self, stem: &str) -> Option<&mut Option<PathBuf>> {
        let slot = match stem {
            "page" => &mut self.page,
            "route" => &mut self.route,
            "layout" => &mut self.layout,
            "template" => &mut self.template,
            "default" => &mut self.default,
            "loading" => &mut self.loading,
            "error" => &mut self.error,
            "not-found" => &mut self.not_found,
            "forbidden" => &mut self.forbidden,
            "unauthorized" => &mut self.unauthorized,
            "global-error" => &mut self.global_error,
            _ => return None,
        };
        Some(slot)
    }
}

/// One directory of the `app/` tree, classified
#[derive(Debug, Clone)]
pub struct AppNode {
    /// Raw directory name; empty for the root
    pub name: String,
    pub segment: Segment,
    pub dir: PathBuf,
    pub files: SpecialFiles,
    pub children: BTreeMap<String, AppNode>,
}

impl AppNode {
    fn new(name: &str, dir: PathBuf) -> Self {
        Self {
            name: name.to_string(),
            segment: classify_segment(name, RouterKind::App),
            dir,
            files: SpecialFiles::default(),
            children: BTreeMap::new(),
        }
    }

    /// Builds the directory tree from `/`-separated paths relative to `root`
    ///
    /// Only convention files (`page`, `layout`, …) with an allowed extension
    /// are recorded, so colocated components and styles are ignored.
    pub fn build<S: AsRef<str>>(root: &Path, files: &[S], extensions: &[String]) -> Self {
        // The root contributes no URL segment.
        let mut tree = Self {
            name: String::new(),
            segment: Segment::Group(String::new()),
            dir: root.to_path_buf(),
            files: SpecialFiles::default(),
            children: BTreeMap::new(),
        };

        for file in files {
            let file = file.as_ref();
            let (dirs, file_name) = match file.rsplit_once('/') {
                Some((dirs, name)) => (dirs, name),
                None => ("", file),
            };
            let Some((stem, extension)) = file_name.rsplit_once('.') else {
                continue;
            };
            if !extensions.iter().any(|allowed| allowed == extension) {
                continue;
            }

            let node = dirs
                .split('/')
                .filter(|d| !d.is_empty())
                .fold(&mut tree, |node, name| node.child_mut(name));
            if let Some(slot) = node.files.slot(stem) {
                if slot.is_none() {
                    *slot = Some(root.join(file));
                }
            }
        }

        tree
    }

    fn child_mut(&mut self, name: &str) -> &mut AppNode {
        let dir = self.dir.join(name);
        self.children
            .entry(name.to_string())
            .or_insert_with(|| AppNode::new(name, dir))
    }

    /// Children that are part of the same URL space (routes and groups)
    pub fn route_children(&self) -> impl Iterator<Item = &AppNode> {
        self.children.values().filter(|child| {
            matches!(
                child.segment,
                Segment::Static(_)
                    | Segment::Dynamic(_)
                    | Segment::CatchAll(_)
                    | Segment::OptionalCatchAll(_)
                    | Segment::Group(_)
            )
        })
    }
}
