use std::collections::BTreeMap;

use githd_api::CommittedFile;
use githd_listing_api::ListingNode;

#[derive(Default)]
struct Folder<'a> {
    folders: BTreeMap<&'a str, Folder<'a>>,
    files: Vec<&'a CommittedFile>,
}

/// Group `files` by folder.
///
/// Folders come before files at every level and both are sorted by name.
/// A folder whose only content is a single sub-folder is merged with it
/// (`src` + `ui` becomes `src/ui`).
#[must_use]
pub fn build_tree(files: &[CommittedFile]) -> Vec<ListingNode> {
    let mut root = Folder::default();
    for file in files {
        let mut components: Vec<&str> = file
            .relative_path
            .split('/')
            .filter(|part| !part.is_empty())
            .collect();
        components.pop();

        let mut folder = &mut root;
        for component in components {
            folder = folder.folders.entry(component).or_default();
        }
        folder.files.push(file);
    }
    into_nodes(root)
}

fn into_nodes(folder: Folder<'_>) -> Vec<ListingNode> {
    let mut nodes = Vec::with_capacity(folder.folders.len() + folder.files.len());

    for (name, child) in folder.folders {
        let (name, child) = compact(name.to_owned(), child);
        nodes.push(ListingNode::Folder {
            name,
            children: into_nodes(child),
        });
    }

    let mut files = folder.files;
    files.sort_by(|a, b| a.file_name().cmp(b.file_name()));
    nodes.extend(files.into_iter().map(|file| ListingNode::File { file: file.clone() }));
    nodes
}

fn compact(mut name: String, mut folder: Folder<'_>) -> (String, Folder<'_>) {
    while folder.files.is_empty() && folder.folders.len() == 1 {
        let Some((child_name, child)) = folder.folders.pop_first() else {
            break;
        };
        name.push('/');
        name.push_str(child_name);
        folder = child;
    }
    (name, folder)
}
