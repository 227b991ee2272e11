//! CLI subcommands and their handlers

use anyhow::{anyhow, bail, Context, Result};
use clap::Subcommand;
use serde::Serialize;
use std::path::{Path, PathBuf};

use media_shelf::browser::{self, BrowserEntry, MediaKind};
use media_shelf::config::AppConfig;
use media_shelf::imaging::thumbnail::{item_thumbnail, thumbnail_bytes};
use media_shelf::state::import::{file_creation_time, import_folder};
use media_shelf::state::{
    LibraryItem, MediaContainer, MediaLibrary, Rating, SortMode, SortOrder, SqliteProvider,
    StorageProvider,
};

#[derive(Subcommand)]
pub enum Commands {
    /// List a directory with media classification
    Browse {
        /// Directory to list
        path: PathBuf,
    },
    /// Print the parent of a path
    Parent { path: String },
    /// List drive roots
    Drives,
    /// Manage libraries
    #[command(subcommand)]
    Library(LibraryCommand),
    /// Manage containers inside a library
    #[command(subcommand)]
    Container(ContainerCommand),
    /// Manage library items
    #[command(subcommand)]
    Item(ItemCommand),
    /// Import every media file in a folder into a container
    Import {
        container: i64,
        folder: PathBuf,
        /// Descend into subfolders
        #[arg(short, long)]
        recursive: bool,
    },
}

#[derive(Subcommand)]
pub enum LibraryCommand {
    Create {
        name: String,
        #[arg(long, default_value = "")]
        owner: String,
    },
    List,
    Rename {
        id: i64,
        name: String,
        /// New owner (unchanged when omitted)
        #[arg(long)]
        owner: Option<String>,
    },
    Delete { id: i64 },
}

#[derive(Subcommand)]
pub enum ContainerCommand {
    Create {
        library: i64,
        name: String,
        /// Parent container (the library root when omitted)
        #[arg(long)]
        parent: Option<i64>,
        #[arg(long)]
        expanded: bool,
    },
    /// Print the container hierarchy of a library
    Tree { library: i64 },
    /// Rename or move a container
    Update {
        id: i64,
        name: String,
        /// New parent (unchanged when omitted)
        #[arg(long)]
        parent: Option<i64>,
        /// New expansion state (unchanged when omitted)
        #[arg(long)]
        expanded: Option<bool>,
    },
    Expand { id: i64 },
    Collapse { id: i64 },
    Delete { id: i64 },
}

#[derive(Subcommand)]
pub enum ItemCommand {
    /// Catalogue a single file
    Add { container: i64, path: PathBuf },
    List {
        container: i64,
        #[arg(long, value_enum, default_value_t)]
        sort: SortMode,
        #[arg(long, value_enum, default_value_t)]
        order: SortOrder,
        /// Include thumbnail sizes in the output
        #[arg(long)]
        thumbnails: bool,
    },
    Rename { id: i64, name: String },
    /// Rate a music or video item from 0 (unrated) to 5
    Rate {
        id: i64,
        #[arg(value_parser = clap::value_parser!(i64).range(0..=5))]
        rating: i64,
    },
    /// Regenerate the thumbnail of an image item
    Thumbnail { id: i64 },
    /// Record an access and print the file path
    Open { id: i64 },
    Delete { id: i64 },
}

/// Output settings shared by every handler
pub struct Output {
    pub json: bool,
}

impl Output {
    fn print<T: Serialize>(&self, value: &T, text: impl FnOnce() -> String) -> Result<()> {
        if self.json {
            println!("{}", serde_json::to_string_pretty(value)?);
        } else {
            println!("{}", text());
        }
        Ok(())
    }
}

pub fn handle_command(command: Commands, config: &AppConfig, output: &Output) -> Result<()> {
    match command {
        Commands::Browse { path } => {
            let listing = browser::browse(&path);
            output.print(&listing, || {
                let mut lines: Vec<String> = listing.entries.iter().map(entry_line).collect();
                lines.extend(
                    listing
                        .warnings
                        .iter()
                        .map(|w| format!("! {}: {}", w.path.display(), w.message)),
                );
                lines.join("\n")
            })
        }
        Commands::Parent { path } => {
            let parent = browser::parent_path(&path);
            output.print(&parent, || parent.clone())
        }
        Commands::Drives => {
            let drives = browser::drives();
            output.print(&drives, || {
                drives.iter().map(entry_line).collect::<Vec<_>>().join("\n")
            })
        }
        Commands::Library(command) => handle_library(command, &open(config)?, output),
        Commands::Container(command) => handle_container(command, &open(config)?, output),
        Commands::Item(command) => handle_item(command, &open(config)?, config, output),
        Commands::Import {
            container,
            folder,
            recursive,
        } => {
            let storage = open(config)?;
            let container = find_container(&storage, container)?;
            let result = import_folder(
                &storage,
                &container,
                &folder,
                recursive,
                config.thumbnail_size,
            )?;
            output.print(&result, || {
                format!(
                    "Imported {} files, skipped {} duplicates.",
                    result.imported_count, result.skipped_count
                )
            })
        }
    }
}

fn open(config: &AppConfig) -> Result<SqliteProvider> {
    SqliteProvider::new(config).with_context(|| {
        format!(
            "Failed to open catalog at {}",
            config.database_path.display()
        )
    })
}

fn handle_library(
    command: LibraryCommand,
    storage: &impl StorageProvider,
    output: &Output,
) -> Result<()> {
    match command {
        LibraryCommand::Create { name, owner } => {
            let library = storage.create_media_library(&name, &owner)?;
            output.print(&library, || library_line(&library))
        }
        LibraryCommand::List => {
            let libraries = storage.read_media_libraries()?;
            output.print(&libraries, || {
                libraries.iter().map(library_line).collect::<Vec<_>>().join("\n")
            })
        }
        LibraryCommand::Rename { id, name, owner } => {
            let current = find_library(storage, id)?;
            let owner = owner.unwrap_or(current.owner);
            storage.update_media_library(id, &name, &owner)?;
            Ok(())
        }
        LibraryCommand::Delete { id } => Ok(storage.delete_media_library(id)?),
    }
}

fn handle_container(
    command: ContainerCommand,
    storage: &impl StorageProvider,
    output: &Output,
) -> Result<()> {
    match command {
        ContainerCommand::Create {
            library,
            name,
            parent,
            expanded,
        } => {
            let library = find_library(storage, library)?;
            let container = storage.create_container(&name, parent, &library, expanded)?;
            output.print(&container, || container_line(&container, 0))
        }
        ContainerCommand::Tree { library } => {
            let mut root = find_library(storage, library)?.root_container;
            storage.load_container_tree(&mut root)?;
            output.print(&root, || {
                let mut lines = Vec::new();
                tree_lines(&root, 0, &mut lines);
                lines.join("\n")
            })
        }
        ContainerCommand::Update {
            id,
            name,
            parent,
            expanded,
        } => {
            let current = find_container(storage, id)?;
            let parent = parent.or(current.parent_id);
            let expanded = expanded.unwrap_or(current.expanded);
            storage.update_container(id, &name, parent, expanded)?;
            Ok(())
        }
        ContainerCommand::Expand { id } => Ok(storage.update_container_expansion(id, true)?),
        ContainerCommand::Collapse { id } => Ok(storage.update_container_expansion(id, false)?),
        ContainerCommand::Delete { id } => Ok(storage.delete_container(id)?),
    }
}

fn handle_item(
    command: ItemCommand,
    storage: &impl StorageProvider,
    config: &AppConfig,
    output: &Output,
) -> Result<()> {
    match command {
        ItemCommand::Add { container, path } => {
            let container = find_container(storage, container)?;
            let name = path
                .file_stem()
                .map(|stem| stem.to_string_lossy().to_string())
                .unwrap_or_else(|| path.to_string_lossy().to_string());
            let thumbnail =
                item_thumbnail(&path, MediaKind::from_path(&path), config.thumbnail_size);
            let item = storage.create_library_item(
                &name,
                &path,
                &container,
                file_creation_time(&path),
                thumbnail.as_deref(),
            )?;
            output.print(&item, || item_line(&item))
        }
        ItemCommand::List {
            container,
            sort,
            order,
            thumbnails,
        } => {
            let container = find_container(storage, container)?;
            let items = storage.read_items_from_container(&container, thumbnails, sort, order)?;
            output.print(&items, || {
                items.iter().map(item_line).collect::<Vec<_>>().join("\n")
            })
        }
        ItemCommand::Rename { id, name } => Ok(storage.update_library_item_name(id, &name)?),
        ItemCommand::Rate { id, rating } => {
            let rating = Rating::from_value(rating).ok_or_else(|| anyhow!("Rating out of range"))?;
            Ok(storage.update_library_item_rating(id, rating)?)
        }
        ItemCommand::Thumbnail { id } => {
            let item = find_item(storage, id)?;
            if item.media.kind() != MediaKind::Image {
                bail!("Item {} is not an image", id);
            }
            let bytes = thumbnail_bytes(Path::new(&item.path), config.thumbnail_size)?;
            Ok(storage.update_library_item_thumbnail(id, Some(&bytes))?)
        }
        ItemCommand::Open { id } => {
            let item = find_item(storage, id)?;
            storage.record_library_item_access(id)?;
            output.print(&item.path, || item.path.clone())
        }
        ItemCommand::Delete { id } => Ok(storage.delete_library_item(id)?),
    }
}

fn find_library(storage: &impl StorageProvider, id: i64) -> Result<MediaLibrary> {
    storage
        .read_media_libraries()?
        .into_iter()
        .find(|library| library.id == id)
        .ok_or_else(|| anyhow!("No library with id {}", id))
}

fn find_container(storage: &impl StorageProvider, id: i64) -> Result<MediaContainer> {
    storage
        .read_container(id)?
        .ok_or_else(|| anyhow!("No container with id {}", id))
}

fn find_item(storage: &impl StorageProvider, id: i64) -> Result<LibraryItem> {
    storage
        .read_library_item(id)?
        .ok_or_else(|| anyhow!("No item with id {}", id))
}

fn entry_line(entry: &BrowserEntry) -> String {
    format!("{:<9} {}", format!("{:?}", entry.kind).to_lowercase(), entry.display_name)
}

fn library_line(library: &MediaLibrary) -> String {
    format!(
        "[{}] {} (owner: {}, root container {})",
        library.id, library.name, library.owner, library.root_container.id
    )
}

fn container_line(container: &MediaContainer, depth: usize) -> String {
    let marker = if container.expanded { "-" } else { "+" };
    format!("{}{} [{}] {}", "  ".repeat(depth), marker, container.id, container.name)
}

fn tree_lines(container: &MediaContainer, depth: usize, lines: &mut Vec<String>) {
    lines.push(container_line(container, depth));
    for child in &container.children {
        tree_lines(child, depth + 1, lines);
    }
}

fn item_line(item: &LibraryItem) -> String {
    let rating = item
        .media
        .rating()
        .map(|r| format!(" {}/5", r.value()))
        .unwrap_or_default();
    let thumbnail = item
        .thumbnail
        .as_ref()
        .map(|t| format!(" thumb {}B", t.len()))
        .unwrap_or_default();
    format!(
        "[{}] {:<5} {}{} (opened {}x, created {}){} {}",
        item.id,
        item.media.kind().as_str(),
        item.name,
        rating,
        item.access_count,
        item.creation_time.format("%Y-%m-%d %H:%M"),
        thumbnail,
        item.path
    )
}
