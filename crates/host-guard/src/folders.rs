//! 폴더 구조 드라이버 -- 서버 루트 디렉토리 배치, 소유권, 권한
//!
//! 트리 순회는 블로킹 파일 시스템 호출이므로 `spawn_blocking`에서 수행합니다.
//! 심볼릭 링크는 따라가지 않습니다.
//!
//! # 권한 규칙
//! - secrets 밖: 소유자 `puid:pgid`, 디렉토리 775, 파일 664
//! - secrets 안: 소유자 `0:0`, 모든 항목 700

use std::fs::{self, Metadata, Permissions};
use std::os::unix::fs::{MetadataExt, PermissionsExt, lchown};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::info;

use bulwark_core::config::FolderSettings;
use bulwark_core::error::{ActionError, CatalogError, ProbeError};
use bulwark_core::fact::{Action, Descriptor, Fact, FactCatalog, Probe};
use bulwark_core::types::{ActionOutcome, FactValue, ProbeOutcome};

/// 리포트 제목
pub const FOLDERS_TITLE: &str = "Docker Folder Structure";

const LAYOUT: &str = "FOLDER LAYOUT";
const PERMISSIONS: &str = "PERMISSIONS";

const DIR_MODE: u32 = 0o775;
const FILE_MODE: u32 = 0o664;
const SECRETS_MODE: u32 = 0o700;

/// 위반 목록에 표시할 최대 항목 수
const MAX_LISTED: usize = 10;

/// 관리 대상 트리
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderLayout {
    root: PathBuf,
    secrets: PathBuf,
    puid: u32,
    pgid: u32,
}

impl FolderLayout {
    /// 설정으로부터 레이아웃을 생성합니다.
    pub fn new(settings: &FolderSettings) -> Self {
        Self {
            root: settings.server_root.clone(),
            secrets: settings.server_root.join(&settings.secrets_dir),
            puid: settings.puid,
            pgid: settings.pgid,
        }
    }

    fn relative(&self, path: &Path) -> String {
        match path.strip_prefix(&self.root) {
            Ok(rel) if rel.as_os_str().is_empty() => ".".to_owned(),
            Ok(rel) => rel.display().to_string(),
            Err(_) => path.display().to_string(),
        }
    }

    fn in_secrets(&self, path: &Path) -> bool {
        path.starts_with(&self.secrets)
    }

    /// secrets 밖에서 소유자가 다른 항목
    fn ownership_offenders(&self) -> std::io::Result<Vec<PathBuf>> {
        Ok(walk(&self.root)?
            .into_iter()
            .filter(|(path, _)| !self.in_secrets(path))
            .filter(|(_, meta)| meta.uid() != self.puid || meta.gid() != self.pgid)
            .map(|(path, _)| path)
            .collect())
    }

    /// secrets 밖에서 권한이 다른 항목
    fn mode_offenders(&self) -> std::io::Result<Vec<(PathBuf, u32)>> {
        Ok(walk(&self.root)?
            .into_iter()
            .filter(|(path, _)| !self.in_secrets(path))
            .filter_map(|(path, meta)| {
                let want = expected_mode(&meta)?;
                (meta.mode() & 0o777 != want).then_some((path, want))
            })
            .collect())
    }

    /// secrets 안에서 root 전용이 아닌 항목
    fn secrets_offenders(&self) -> std::io::Result<Vec<PathBuf>> {
        Ok(walk(&self.secrets)?
            .into_iter()
            .filter(|(_, meta)| {
                meta.uid() != 0
                    || meta.gid() != 0
                    || (!meta.file_type().is_symlink() && meta.mode() & 0o777 != SECRETS_MODE)
            })
            .map(|(path, _)| path)
            .collect())
    }
}

fn expected_mode(meta: &Metadata) -> Option<u32> {
    let ft = meta.file_type();
    if ft.is_dir() {
        Some(DIR_MODE)
    } else if ft.is_file() {
        Some(FILE_MODE)
    } else {
        None
    }
}

/// 트리를 순회하며 (경로, 메타데이터)를 수집합니다. 시작 경로를 포함합니다.
fn walk(start: &Path) -> std::io::Result<Vec<(PathBuf, Metadata)>> {
    let mut out = Vec::new();
    let mut stack = vec![start.to_path_buf()];
    while let Some(path) = stack.pop() {
        let meta = fs::symlink_metadata(&path)?;
        if meta.is_dir() {
            for entry in fs::read_dir(&path)? {
                stack.push(entry?.path());
            }
        }
        out.push((path, meta));
    }
    out.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(out)
}

/// 위반 목록을 리포트용 문자열 목록으로 요약합니다.
fn summarize(layout: &FolderLayout, paths: &[PathBuf]) -> Vec<String> {
    let mut listed: Vec<String> = paths
        .iter()
        .take(MAX_LISTED)
        .map(|p| layout.relative(p))
        .collect();
    if paths.len() > MAX_LISTED {
        listed.push(format!("(+{} more)", paths.len() - MAX_LISTED));
    }
    listed
}

async fn blocking<T, F>(path: &Path, f: F) -> Result<T, std::io::Error>
where
    T: Send + 'static,
    F: FnOnce() -> std::io::Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(f).await.map_err(|e| {
        std::io::Error::other(format!("{}: worker failed: {e}", path.display()))
    })?
}

/// 조회할 폴더 속성
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FolderCheck {
    /// 디렉토리 존재
    Directory(PathBuf),
    /// 파일 존재
    File(PathBuf),
    /// secrets 밖 소유권
    TreeOwnership,
    /// secrets 밖 권한
    TreeModes,
    /// secrets 잠금
    SecretsLocked,
}

/// 폴더 프로브
pub struct FolderProbe {
    check: FolderCheck,
    layout: Arc<FolderLayout>,
}

impl Probe for FolderProbe {
    async fn probe(&self) -> ProbeOutcome {
        let layout = self.layout.clone();
        let result = match &self.check {
            FolderCheck::Directory(path) => exists(path, true).await,
            FolderCheck::File(path) => exists(path, false).await,
            FolderCheck::TreeOwnership => {
                let root = layout.root.clone();
                let l = layout.clone();
                blocking(&root, move || l.ownership_offenders())
                    .await
                    .map(|paths| findings(&layout, &paths))
                    .map_err(|e| ProbeError::from_io(root.display().to_string(), &e))
            }
            FolderCheck::TreeModes => {
                let root = layout.root.clone();
                let l = layout.clone();
                blocking(&root, move || l.mode_offenders())
                    .await
                    .map(|found| {
                        let paths: Vec<PathBuf> = found.into_iter().map(|(p, _)| p).collect();
                        findings(&layout, &paths)
                    })
                    .map_err(|e| ProbeError::from_io(root.display().to_string(), &e))
            }
            FolderCheck::SecretsLocked => {
                let secrets = layout.secrets.clone();
                let l = layout.clone();
                blocking(&secrets, move || l.secrets_offenders())
                    .await
                    .map(|paths| findings(&layout, &paths))
                    .map_err(|e| ProbeError::from_io(secrets.display().to_string(), &e))
            }
        };
        match result {
            Ok(outcome) => outcome,
            Err(e) => ProbeOutcome::Error(e),
        }
    }
}

fn findings(layout: &FolderLayout, paths: &[PathBuf]) -> ProbeOutcome {
    ProbeOutcome::from_findings(summarize(layout, paths))
}

async fn exists(path: &Path, dir: bool) -> Result<ProbeOutcome, ProbeError> {
    match tokio::fs::symlink_metadata(path).await {
        Ok(meta) => {
            let ok = if dir { meta.is_dir() } else { meta.is_file() };
            Ok(ProbeOutcome::Present(FactValue::Bool(ok)))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Ok(ProbeOutcome::Present(FactValue::Bool(false)))
        }
        Err(e) => Err(ProbeError::from_io(path.display().to_string(), &e)),
    }
}

/// 폴더 교정 액션
pub struct FolderAction {
    fix: FolderCheck,
    layout: Arc<FolderLayout>,
}

impl Action for FolderAction {
    fn describe(&self) -> String {
        let l = &self.layout;
        match &self.fix {
            FolderCheck::Directory(path) => format!("mkdir -p {}", path.display()),
            FolderCheck::File(path) => format!("touch {}", path.display()),
            FolderCheck::TreeOwnership => format!(
                "chown -R {}:{} {} (excluding {})",
                l.puid,
                l.pgid,
                l.root.display(),
                l.relative(&l.secrets)
            ),
            FolderCheck::TreeModes => format!(
                "chmod dirs {DIR_MODE:o} / files {FILE_MODE:o} under {} (excluding {})",
                l.root.display(),
                l.relative(&l.secrets)
            ),
            FolderCheck::SecretsLocked => format!(
                "chown -R root:root {0}; chmod -R {SECRETS_MODE:o} {0}",
                l.secrets.display()
            ),
        }
    }

    async fn execute(&self, descriptor: &Descriptor) -> Result<ActionOutcome, ActionError> {
        let layout = self.layout.clone();
        let fix = self.fix.clone();
        let root = layout.root.clone();
        let changed = blocking(&root, move || apply_fix(&layout, &fix))
            .await
            .map_err(|e| ActionError::from_io(root.display().to_string(), &e))?;
        info!(fact = %descriptor.id, changed, "folder fix applied");
        if changed == 0 {
            Ok(ActionOutcome::unchanged("nothing to change"))
        } else {
            Ok(ActionOutcome::applied(format!(
                "{} ({changed} entries)",
                self.describe()
            )))
        }
    }
}

/// 교정을 수행하고 변경된 항목 수를 반환합니다.
fn apply_fix(layout: &FolderLayout, fix: &FolderCheck) -> std::io::Result<usize> {
    match fix {
        FolderCheck::Directory(path) => {
            fs::create_dir_all(path)?;
            Ok(1)
        }
        FolderCheck::File(path) => {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)?;
            Ok(1)
        }
        FolderCheck::TreeOwnership => {
            let offenders = layout.ownership_offenders()?;
            for path in &offenders {
                lchown(path, Some(layout.puid), Some(layout.pgid))?;
            }
            Ok(offenders.len())
        }
        FolderCheck::TreeModes => {
            let offenders = layout.mode_offenders()?;
            for (path, mode) in &offenders {
                fs::set_permissions(path, Permissions::from_mode(*mode))?;
            }
            Ok(offenders.len())
        }
        FolderCheck::SecretsLocked => {
            let offenders = layout.secrets_offenders()?;
            for path in &offenders {
                lchown(path, Some(0), Some(0))?;
                if !fs::symlink_metadata(path)?.file_type().is_symlink() {
                    fs::set_permissions(path, Permissions::from_mode(SECRETS_MODE))?;
                }
            }
            Ok(offenders.len())
        }
    }
}

/// 폴더 도메인 카탈로그를 생성합니다.
pub fn folder_catalog(settings: &FolderSettings) -> Result<FactCatalog, CatalogError> {
    let layout = Arc::new(FolderLayout::new(settings));
    let mut catalog = FactCatalog::new();
    let mut add = |descriptor: Descriptor, check: FolderCheck| {
        catalog.register(Fact::new(
            descriptor,
            FolderProbe {
                check: check.clone(),
                layout: layout.clone(),
            },
            FolderAction {
                fix: check,
                layout: layout.clone(),
            },
        ))
    };

    let root = &settings.server_root;
    add(
        Descriptor::equals(
            LAYOUT,
            format!("Directory {}", root.display()),
            FactValue::Bool(true),
        ),
        FolderCheck::Directory(root.clone()),
    )?;
    for rel in &settings.structure {
        add(
            Descriptor::equals(LAYOUT, format!("Directory {rel}"), FactValue::Bool(true)),
            FolderCheck::Directory(root.join(rel)),
        )?;
    }
    for rel in &settings.placeholders {
        add(
            Descriptor::equals(LAYOUT, format!("File {rel}"), FactValue::Bool(true)),
            FolderCheck::File(root.join(rel)),
        )?;
    }

    add(
        Descriptor::absent(PERMISSIONS, "Tree ownership"),
        FolderCheck::TreeOwnership,
    )?;
    add(
        Descriptor::absent(PERMISSIONS, "Tree modes"),
        FolderCheck::TreeModes,
    )?;
    add(
        Descriptor::absent(PERMISSIONS, "Secrets locked down"),
        FolderCheck::SecretsLocked,
    )?;
    Ok(catalog)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(root: &Path, puid: u32, pgid: u32) -> FolderSettings {
        FolderSettings {
            server_root: root.to_path_buf(),
            puid,
            pgid,
            structure: vec!["apps".to_owned(), "secrets".to_owned(), "logs/docker".to_owned()],
            placeholders: vec!["compose.yaml".to_owned()],
            secrets_dir: "secrets".to_owned(),
            report_file: "unused".to_owned(),
        }
    }

    fn current_ids(path: &Path) -> (u32, u32) {
        let meta = fs::metadata(path).unwrap();
        (meta.uid(), meta.gid())
    }

    #[test]
    fn catalog_lists_layout_then_permissions() {
        let s = settings(Path::new("/srv/stack"), 1000, 1000);
        let catalog = folder_catalog(&s).unwrap();
        let ids: Vec<&str> = catalog.iter().map(|f| f.descriptor().id.as_str()).collect();
        assert_eq!(
            ids,
            vec![
                "Directory /srv/stack",
                "Directory apps",
                "Directory secrets",
                "Directory logs/docker",
                "File compose.yaml",
                "Tree ownership",
                "Tree modes",
                "Secrets locked down",
            ]
        );
    }

    #[tokio::test]
    async fn directory_probe_and_action() {
        let dir = tempfile::tempdir().unwrap();
        let layout = Arc::new(FolderLayout::new(&settings(dir.path(), 0, 0)));
        let target = dir.path().join("backups/snapshots");
        let probe = FolderProbe {
            check: FolderCheck::Directory(target.clone()),
            layout: layout.clone(),
        };
        assert_eq!(probe.probe().await, ProbeOutcome::Present(FactValue::Bool(false)));

        let action = FolderAction {
            fix: FolderCheck::Directory(target.clone()),
            layout,
        };
        let d = Descriptor::equals(LAYOUT, "Directory backups/snapshots", FactValue::Bool(true));
        assert!(action.execute(&d).await.unwrap().applied);
        assert_eq!(probe.probe().await, ProbeOutcome::Present(FactValue::Bool(true)));
    }

    #[tokio::test]
    async fn file_action_does_not_truncate() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("compose.yaml");
        fs::write(&path, "services: {}\n").unwrap();
        let layout = Arc::new(FolderLayout::new(&settings(dir.path(), 0, 0)));
        apply_fix(&layout, &FolderCheck::File(path.clone())).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "services: {}\n");
    }

    #[tokio::test]
    async fn ownership_reports_foreign_owner() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("apps")).unwrap();
        let (uid, gid) = current_ids(dir.path());
        let layout = Arc::new(FolderLayout::new(&settings(dir.path(), uid + 1, gid)));
        let probe = FolderProbe {
            check: FolderCheck::TreeOwnership,
            layout,
        };
        match probe.probe().await {
            ProbeOutcome::Present(FactValue::List(items)) => {
                assert!(items.contains(&".".to_owned()));
                assert!(items.contains(&"apps".to_owned()));
            }
            other => panic!("expected offenders, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn ownership_ignores_secrets_tree() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("secrets")).unwrap();
        let (uid, gid) = current_ids(dir.path());
        let layout = FolderLayout::new(&settings(dir.path(), uid, gid));
        assert!(layout.ownership_offenders().unwrap().is_empty());
    }

    #[tokio::test]
    async fn modes_fixed_outside_secrets_only() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir(root.join("apps")).unwrap();
        fs::create_dir(root.join("secrets")).unwrap();
        fs::write(root.join("apps/app.env"), "").unwrap();
        fs::write(root.join("secrets/key"), "").unwrap();
        fs::set_permissions(root.join("apps/app.env"), Permissions::from_mode(0o600)).unwrap();
        fs::set_permissions(root.join("secrets/key"), Permissions::from_mode(0o644)).unwrap();

        let (uid, gid) = current_ids(root);
        let layout = FolderLayout::new(&settings(root, uid, gid));
        assert!(!layout.mode_offenders().unwrap().is_empty());
        apply_fix(&layout, &FolderCheck::TreeModes).unwrap();
        assert!(layout.mode_offenders().unwrap().is_empty());

        let file_mode = fs::metadata(root.join("apps/app.env")).unwrap().mode() & 0o777;
        assert_eq!(file_mode, FILE_MODE);
        let secret_mode = fs::metadata(root.join("secrets/key")).unwrap().mode() & 0o777;
        assert_eq!(secret_mode, 0o644);
    }

    #[tokio::test]
    async fn loose_secrets_are_reported() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("secrets")).unwrap();
        fs::set_permissions(dir.path().join("secrets"), Permissions::from_mode(0o755)).unwrap();
        let layout = Arc::new(FolderLayout::new(&settings(dir.path(), 0, 0)));
        let probe = FolderProbe {
            check: FolderCheck::SecretsLocked,
            layout,
        };
        match probe.probe().await {
            ProbeOutcome::Present(FactValue::List(items)) => assert_eq!(items, vec!["secrets"]),
            other => panic!("expected offenders, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn missing_root_is_probe_error() {
        let layout = Arc::new(FolderLayout::new(&settings(
            Path::new("/nonexistent/bulwark-root"),
            0,
            0,
        )));
        let probe = FolderProbe {
            check: FolderCheck::TreeModes,
            layout,
        };
        assert!(matches!(probe.probe().await, ProbeOutcome::Error(ProbeError::Io { .. })));
    }

    #[test]
    fn summarize_caps_list() {
        let layout = FolderLayout::new(&settings(Path::new("/srv"), 0, 0));
        let paths: Vec<PathBuf> = (0..15).map(|i| PathBuf::from(format!("/srv/f{i}"))).collect();
        let listed = summarize(&layout, &paths);
        assert_eq!(listed.len(), MAX_LISTED + 1);
        assert_eq!(listed.last().unwrap(), "(+5 more)");
    }
}
