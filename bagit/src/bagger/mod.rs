//! Bag creation - turns plain directories into bags.
//!
//! In-place bagging stages the new layout (`data/`, `bagit.txt`, payload
//! manifest) inside a hidden directory under the target, then commits it:
//! payload first, tag files last. A failure puts every moved entry back
//! where it was; anything that cannot be put back stays in the staging
//! directory, which is then kept.

use crate::bag::manifest::{discover_manifests, parse_manifest_file_name, Manifest, ManifestKind};
use crate::bag::tagfile::{read_bagit_file, write_bagit_file};
use crate::bag::{Bag, Version, BAGIT_FILE, DATA_DIR};
use crate::checksum::{hash_file_with_buffer, Algorithm, READ_BUFFER};
use crate::fs::walker::{walk_directory, WalkOptions};
use crate::utils::{BagError, BagStep, IoContext, Result, StepContext};
use std::collections::HashSet;
use std::ffi::OsString;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, error, info, warn};

/// Prefix of the staging directory created under the bag root.
const STAGING_PREFIX: &str = ".bagit-staging-";

/// Options shared by every bagging operation
#[derive(Debug, Clone)]
pub struct BagOptions {
    pub algorithm: Algorithm,
    pub version: Version,
    pub read_buffer_size: usize,
    /// Report what would happen without touching the file system
    pub dry_run: bool,
}

impl Default for BagOptions {
    fn default() -> Self {
        Self {
            algorithm: Algorithm::Md5,
            version: Version::default(),
            read_buffer_size: READ_BUFFER,
            dry_run: false,
        }
    }
}

/// A file system change made (or, in dry-run mode, planned) while bagging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BagAction {
    CreateDirectory(PathBuf),
    Move { from: PathBuf, to: PathBuf },
    Copy { from: PathBuf, to: PathBuf },
    WriteFile(PathBuf),
}

impl fmt::Display for BagAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BagAction::CreateDirectory(path) => write!(f, "create {}", path.display()),
            BagAction::Move { from, to } => {
                write!(f, "move {} to {}", from.display(), to.display())
            }
            BagAction::Copy { from, to } => {
                write!(f, "copy {} to {}", from.display(), to.display())
            }
            BagAction::WriteFile(path) => write!(f, "write {}", path.display()),
        }
    }
}

/// Result of a bagging operation
#[derive(Debug)]
pub struct BagOutcome {
    /// Bag descriptor. Best-effort in dry-run mode.
    pub bag: Bag,
    /// Changes made, or planned when `dry_run` is set
    pub actions: Vec<BagAction>,
    pub dry_run: bool,
}

/// Creates bags according to a fixed set of options
pub struct Bagger {
    options: BagOptions,
}

impl Bagger {
    pub fn new(options: BagOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &BagOptions {
        &self.options
    }

    /// Restructure `directory` into a bag in place.
    ///
    /// Every top-level entry moves under `data/`, then `bagit.txt` and
    /// `manifest-<alg>.txt` are written at the root. Fails with
    /// `AlreadyBagged` if `data/` already exists.
    pub fn bag_in_place(&self, directory: &Path) -> Result<BagOutcome> {
        ensure_directory(directory)?;

        let data_dir = directory.join(DATA_DIR);
        if data_dir.symlink_metadata().is_ok() {
            return Err(BagError::AlreadyBagged(data_dir));
        }

        let entries = top_level_names(directory)?;

        if self.options.dry_run {
            return self.plan_in_place(directory, &entries);
        }

        info!(
            "Bagging {} in place ({} top-level entries, algorithm: {})",
            directory.display(),
            entries.len(),
            self.options.algorithm
        );

        let staging = tempfile::Builder::new()
            .prefix(STAGING_PREFIX)
            .tempdir_in(directory)
            .at(directory)
            .step(BagStep::CreateDataDirectory)?;

        let mut moved: Vec<OsString> = Vec::new();
        let staged = self.stage(directory, staging.path(), &entries, &mut moved);
        let (manifest, total_bytes, total_files) = match staged {
            Ok(staged) => staged,
            Err(e) => return Err(abandon(directory, staging, &moved, e)),
        };

        let manifest_name = ManifestKind::Payload.file_name(self.options.algorithm);
        if let Err(e) = commit(staging.path(), directory, &manifest_name) {
            return Err(abandon(directory, staging, &moved, e));
        }

        let mut actions = vec![BagAction::CreateDirectory(data_dir.clone())];
        actions.extend(entries.iter().map(|name| BagAction::Move {
            from: directory.join(name),
            to: data_dir.join(name),
        }));
        actions.push(BagAction::WriteFile(directory.join(BAGIT_FILE)));
        actions.push(BagAction::WriteFile(directory.join(&manifest_name)));

        let mut bag = Bag::new(directory, self.options.version);
        bag.payload_manifests
            .push(manifest.rebase(staging.path(), directory));
        bag.set_payload_oxum(total_bytes, total_files);

        if let Err(e) = staging.close() {
            warn!("Could not remove staging directory: {}", e);
        }

        info!(
            "Completed bag in place for {} ({} files, {} bytes)",
            directory.display(),
            total_files,
            total_bytes
        );

        Ok(BagOutcome {
            bag,
            actions,
            dry_run: false,
        })
    }

    /// Build the whole bag inside `staging`: moves, tag file, manifest.
    fn stage(
        &self,
        directory: &Path,
        staging: &Path,
        entries: &[OsString],
        moved: &mut Vec<OsString>,
    ) -> Result<(Manifest, u64, usize)> {
        let staging_data = staging.join(DATA_DIR);
        fs::create_dir(&staging_data)
            .at(&staging_data)
            .step(BagStep::CreateDataDirectory)?;

        for name in entries {
            let from = directory.join(name);
            let to = staging_data.join(name);
            fs::rename(&from, &to).at(&from).step(BagStep::MovePayload)?;
            debug!("Moved {} into payload", from.display());
            moved.push(name.clone());
        }

        write_bagit_file(staging, self.options.version).step(BagStep::WriteBagitFile)?;

        let mut total_bytes = 0u64;
        let mut total_files = 0usize;
        let manifest = Manifest::build_with(
            self.options.algorithm,
            &staging_data,
            self.options.read_buffer_size,
            |file| {
                total_bytes += file.size;
                total_files += 1;
            },
        )
        .step(BagStep::BuildManifest)?;

        manifest
            .write(staging, ManifestKind::Payload, staging)
            .step(BagStep::WriteManifest)?;

        Ok((manifest, total_bytes, total_files))
    }

    fn plan_in_place(&self, directory: &Path, entries: &[OsString]) -> Result<BagOutcome> {
        let data_dir = directory.join(DATA_DIR);
        let mut actions = vec![BagAction::CreateDirectory(data_dir.clone())];
        actions.extend(entries.iter().map(|name| BagAction::Move {
            from: directory.join(name),
            to: data_dir.join(name),
        }));
        actions.push(BagAction::WriteFile(directory.join(BAGIT_FILE)));
        actions.push(BagAction::WriteFile(
            directory.join(ManifestKind::Payload.file_name(self.options.algorithm)),
        ));

        let mut bag = Bag::new(directory, self.options.version);
        let preview = self.preview_manifest(directory, &data_dir, &mut bag)?;
        bag.payload_manifests.push(preview);

        Ok(report_plan(bag, actions))
    }

    /// Manifest the payload would get, computed read-only from `source` and
    /// keyed as if it already lived under `data_dir`.
    fn preview_manifest(&self, source: &Path, data_dir: &Path, bag: &mut Bag) -> Result<Manifest> {
        let mut total_bytes = 0u64;
        let mut total_files = 0usize;
        let manifest = Manifest::build_with(
            self.options.algorithm,
            source,
            self.options.read_buffer_size,
            |file| {
                total_bytes += file.size;
                total_files += 1;
            },
        )?;
        bag.set_payload_oxum(total_bytes, total_files);
        Ok(manifest.rebase(source, data_dir))
    }

    /// Copy the contents of every source directory into `destination`, then
    /// bag `destination` in place. Sources are left untouched.
    ///
    /// `destination` is created when missing and must be empty otherwise.
    /// Two sources providing the same top-level name is an error.
    pub fn bag_to_directory(&self, sources: &[PathBuf], destination: &Path) -> Result<BagOutcome> {
        if destination.exists() {
            ensure_directory(destination)?;
            if fs::read_dir(destination).at(destination)?.next().is_some() {
                return Err(BagError::DestinationNotEmpty(destination.to_path_buf()));
            }
        }

        let mut seen = HashSet::new();
        for source in sources {
            ensure_directory(source)?;
            for name in top_level_names(source)? {
                if !seen.insert(name.clone()) {
                    return Err(BagError::NameCollision(destination.join(name)));
                }
            }
        }

        if self.options.dry_run {
            return self.plan_to_directory(sources, destination);
        }

        let mut copies = Vec::new();
        if !destination.exists() {
            fs::create_dir_all(destination)
                .at(destination)
                .step(BagStep::CopyPayload)?;
        }
        for source in sources {
            copies.extend(copy_tree(source, destination).step(BagStep::CopyPayload)?);
        }
        info!(
            "Copied {} files from {} source(s) into {}",
            copies.len(),
            sources.len(),
            destination.display()
        );

        let mut outcome = self.bag_in_place(destination)?;
        let mut actions = copies;
        actions.append(&mut outcome.actions);
        outcome.actions = actions;
        Ok(outcome)
    }

    fn plan_to_directory(&self, sources: &[PathBuf], destination: &Path) -> Result<BagOutcome> {
        let data_dir = destination.join(DATA_DIR);
        let mut actions = Vec::new();
        if !destination.exists() {
            actions.push(BagAction::CreateDirectory(destination.to_path_buf()));
        }
        actions.push(BagAction::CreateDirectory(data_dir.clone()));

        let mut bag = Bag::new(destination, self.options.version);
        let mut manifest = Manifest::new(self.options.algorithm);
        let mut total_bytes = 0u64;
        let mut total_files = 0usize;

        for source in sources {
            for file in walk_directory(source, WalkOptions::default())? {
                actions.push(BagAction::Copy {
                    from: file.path.clone(),
                    to: data_dir.join(&file.relative_path),
                });
                let digest = hash_file_with_buffer(
                    &file.path,
                    self.options.algorithm,
                    self.options.read_buffer_size,
                )?;
                manifest.insert(data_dir.join(&file.relative_path), digest);
                total_bytes += file.size;
                total_files += 1;
            }
        }

        actions.push(BagAction::WriteFile(destination.join(BAGIT_FILE)));
        actions.push(BagAction::WriteFile(
            destination.join(ManifestKind::Payload.file_name(self.options.algorithm)),
        ));
        bag.payload_manifests.push(manifest);
        bag.set_payload_oxum(total_bytes, total_files);

        Ok(report_plan(bag, actions))
    }

    /// Regenerate every `tagmanifest-<alg>.txt` in `bag_dir`.
    ///
    /// Each one is rewritten from scratch to cover every regular file at the
    /// bag root except the tag manifests themselves. A bag without tag
    /// manifests is left alone.
    pub fn update_tag_manifests(&self, bag_dir: &Path) -> Result<BagOutcome> {
        ensure_directory(bag_dir)?;

        let version = if bag_dir.join(BAGIT_FILE).is_file() {
            read_bagit_file(bag_dir)?.version
        } else {
            self.options.version
        };
        let mut bag = Bag::new(bag_dir, version);

        let tag_manifests: Vec<_> = discover_manifests(bag_dir)?
            .into_iter()
            .filter(|m| m.kind == ManifestKind::Tag)
            .collect();

        if tag_manifests.is_empty() {
            info!("No tag manifests in {}, nothing to update", bag_dir.display());
            return Ok(BagOutcome {
                bag,
                actions: Vec::new(),
                dry_run: self.options.dry_run,
            });
        }

        let tag_files: Vec<_> = walk_directory(bag_dir, WalkOptions::top_level())?
            .into_iter()
            .filter(|file| {
                let name = file.relative_path.to_string_lossy();
                !matches!(
                    parse_manifest_file_name(&name),
                    Some(Ok((ManifestKind::Tag, _)))
                )
            })
            .collect();

        let mut actions = Vec::new();
        for tag_manifest in &tag_manifests {
            let mut manifest = Manifest::new(tag_manifest.algorithm);
            for file in &tag_files {
                let digest = hash_file_with_buffer(
                    &file.path,
                    tag_manifest.algorithm,
                    self.options.read_buffer_size,
                )?;
                manifest.insert(file.path.clone(), digest);
            }

            if !self.options.dry_run {
                manifest
                    .write(bag_dir, ManifestKind::Tag, bag_dir)
                    .step(BagStep::WriteTagManifest)?;
                info!(
                    "Rewrote {} ({} entries)",
                    tag_manifest.path.display(),
                    manifest.len()
                );
            }
            actions.push(BagAction::WriteFile(tag_manifest.path.clone()));
            bag.tag_manifests.push(manifest);
        }

        Ok(BagOutcome {
            bag,
            actions,
            dry_run: self.options.dry_run,
        })
    }
}

fn report_plan(bag: Bag, actions: Vec<BagAction>) -> BagOutcome {
    debug!("Planned {} actions for {}", actions.len(), bag.root_dir.display());
    BagOutcome {
        bag,
        actions,
        dry_run: true,
    }
}

fn ensure_directory(path: &Path) -> Result<()> {
    if !path.is_dir() {
        return Err(BagError::NotADirectory(path.to_path_buf()));
    }
    Ok(())
}

/// Names of the immediate children of `directory`, sorted.
fn top_level_names(directory: &Path) -> Result<Vec<OsString>> {
    let mut names = Vec::new();
    for entry in fs::read_dir(directory).at(directory)? {
        names.push(entry.at(directory)?.file_name());
    }
    names.sort();
    Ok(names)
}

/// Move the staged `data/`, payload manifest and `bagit.txt` into
/// `directory`, in that order. On failure the ones already moved go back
/// into `staging`.
fn commit(staging: &Path, directory: &Path, manifest_name: &str) -> Result<()> {
    let mut committed = Vec::new();
    for name in [DATA_DIR, manifest_name, BAGIT_FILE] {
        let target = directory.join(name);
        if let Err(e) = fs::rename(staging.join(name), &target).at(&target) {
            for done in committed.iter().rev() {
                if let Err(undo) = fs::rename(directory.join(done), staging.join(done)) {
                    error!("Could not move {} back into staging: {}", done, undo);
                }
            }
            return Err(BagError::Step {
                step: BagStep::Commit,
                source: Box::new(e),
            });
        }
        committed.push(name);
    }
    Ok(())
}

/// Undo a failed in-place bagging. The staging directory is only deleted
/// once every moved entry is back in `directory`; otherwise it is kept and
/// its path is reported in the error.
fn abandon(directory: &Path, staging: TempDir, moved: &[OsString], e: BagError) -> BagError {
    debug!("Undoing partial bag of {} after: {}", directory.display(), e);
    if roll_back(directory, &staging.path().join(DATA_DIR), moved) {
        return e;
    }

    #[allow(deprecated)]
    let kept = staging.into_path();
    error!("Unrestored entries kept in {}", kept.display());
    BagError::RollbackIncomplete {
        staging: kept,
        source: Box::new(e),
    }
}

/// Put every moved entry back at the top of `directory`. Best effort: each
/// failure is logged and the rest are still attempted. Returns whether all
/// of them were restored.
fn roll_back(directory: &Path, staging_data: &Path, moved: &[OsString]) -> bool {
    let mut restored = 0;
    for name in moved.iter().rev() {
        let from = staging_data.join(name);
        let to = directory.join(name);
        match fs::rename(&from, &to) {
            Ok(()) => {
                debug!("Restored {}", to.display());
                restored += 1;
            }
            Err(e) => error!(
                "Could not restore {} (left at {}): {}",
                to.display(),
                from.display(),
                e
            ),
        }
    }
    if !moved.is_empty() {
        warn!(
            "Rolled back {}/{} moved entries in {}",
            restored,
            moved.len(),
            directory.display()
        );
    }
    restored == moved.len()
}

/// Copy every file under `source` to the same relative path under `target`.
fn copy_tree(source: &Path, target: &Path) -> Result<Vec<BagAction>> {
    let mut actions = Vec::new();

    for file in walk_directory(source, WalkOptions::default())? {
        let to = target.join(&file.relative_path);
        if let Some(parent) = to.parent() {
            fs::create_dir_all(parent).at(parent)?;
        }
        fs::copy(&file.path, &to).at(&file.path)?;
        actions.push(BagAction::Copy {
            from: file.path,
            to,
        });
    }

    Ok(actions)
}
