//! Integration tests for the build, install and deploy pipeline.

use std::fs;
use std::path::{Path, PathBuf};

use stencil_templates::{
    build, format_templates, list, BuildInfo, Deployer, ErrorKind, Installer, OutputFormat,
    TemplateError, MANIFEST_FILE,
};
use tempfile::tempdir;

fn write_template(root: &Path, dir_name: &str, author: &str, version: &str) -> PathBuf {
    let dir = root.join(dir_name);
    fs::create_dir_all(dir.join("content/docs")).unwrap();
    fs::write(
        dir.join(MANIFEST_FILE),
        format!(
            "template:\n  id: good-project\n  author: {author}\n  version: {version}\n  \
             display: Good Project\n  type: project\ndefaults:\n  license: Apache-2.0\n"
        ),
    )
    .unwrap();
    fs::write(dir.join("content/plain.txt"), "plain {{project_name}}\n").unwrap();
    fs::write(
        dir.join("content/docs/__REPLACE__.md.tmpl"),
        "# {{project_name}}\n\nLicensed under {{license}} by {{puppet_module.author}}.\n",
    )
    .unwrap();
    dir
}

fn installer() -> Installer {
    Installer::new().unwrap()
}

#[test]
fn test_build_install_deploy() {
    let temp = tempdir().unwrap();
    let source = write_template(temp.path(), "good-project", "gooder", "0.1.0");
    let catalog = temp.path().join("catalog");
    let work = temp.path().join("work");
    fs::create_dir_all(&work).unwrap();

    let package = build(&source, &temp.path().join("pkg")).unwrap();
    assert_eq!(package, temp.path().join("pkg/good-project.tar.gz"));

    let installed = installer()
        .install(&package.to_string_lossy(), &catalog, false)
        .unwrap();
    assert_eq!(installed, catalog.join("gooder/good-project/0.1.0"));
    assert!(installed.join(MANIFEST_FILE).is_file());
    assert!(installed.join("content/plain.txt").is_file());
    assert!(installed.join("content/docs/__REPLACE__.md.tmpl").is_file());

    let deployed = Deployer::new(&catalog)
        .with_working_dir(&work)
        .with_user_config(None)
        .deploy("gooder/good-project", None, Some("woo"), &BuildInfo::default())
        .unwrap();

    let root = work.join("woo");
    assert_eq!(deployed, vec![root.join("docs/woo.md"), root.join("plain.txt")]);

    let rendered = fs::read_to_string(root.join("docs/woo.md")).unwrap();
    assert!(rendered.starts_with("# woo\n"));
    assert!(rendered.contains("Licensed under Apache-2.0"));
    assert_eq!(fs::read_to_string(root.join("plain.txt")).unwrap(), "plain woo\n");
}

#[test]
fn test_user_overrides_apply_on_deploy() {
    let temp = tempdir().unwrap();
    let source = write_template(temp.path(), "good-project", "gooder", "0.1.0");
    let catalog = temp.path().join("catalog");
    let package = build(&source, &temp.path().join("pkg")).unwrap();
    installer()
        .install(&package.to_string_lossy(), &catalog, false)
        .unwrap();

    let config = temp.path().join("stencil.yml");
    fs::write(&config, "license: MIT\npuppet_module:\n  author: someone\n").unwrap();

    Deployer::new(&catalog)
        .with_working_dir(temp.path())
        .with_user_config(Some(config))
        .deploy("good-project", Some(&temp.path().join("out")), Some("woo"), &BuildInfo::default())
        .unwrap();

    let rendered = fs::read_to_string(temp.path().join("out/woo/docs/woo.md")).unwrap();
    assert!(rendered.contains("Licensed under MIT by someone."));
}

#[test]
fn test_reinstall_requires_force() {
    let temp = tempdir().unwrap();
    let source = write_template(temp.path(), "good-project", "gooder", "0.1.0");
    let catalog = temp.path().join("catalog");
    let package = build(&source, &temp.path().join("pkg")).unwrap();
    let locator = package.to_string_lossy().into_owned();

    let installed = installer().install(&locator, &catalog, false).unwrap();
    fs::write(installed.join("content/local-edit.txt"), "mine").unwrap();

    let err = installer().install(&locator, &catalog, false).unwrap_err();
    assert!(matches!(err, TemplateError::AlreadyInstalled(_)));
    assert_eq!(err.kind(), ErrorKind::Conflict);
    assert!(installed.join("content/local-edit.txt").exists());

    installer().install(&locator, &catalog, true).unwrap();
    assert!(!installed.join("content/local-edit.txt").exists());
    assert!(installed.join("content/plain.txt").exists());
}

#[test]
fn test_list_shows_newest_version() {
    let temp = tempdir().unwrap();
    let catalog = temp.path().join("catalog");

    for (dir, version) in [("v1/good-project", "0.1.0"), ("v2/good-project", "0.10.0"), ("v3/good-project", "0.9.0")] {
        let source = write_template(temp.path(), dir, "gooder", version);
        let package = build(&source, &temp.path().join(dir).with_extension("pkg")).unwrap();
        installer()
            .install(&package.to_string_lossy(), &catalog, false)
            .unwrap();
    }

    let templates = list(&catalog, "").unwrap();
    assert_eq!(templates.len(), 1);
    assert_eq!(templates[0].version(), "0.10.0");

    let table = format_templates(&templates, OutputFormat::Table).unwrap();
    assert!(table.contains("Good Project"));
    assert!(table.contains("0.10.0"));
}

#[test]
fn test_invalid_template_is_not_built() {
    let temp = tempdir().unwrap();
    let source = temp.path().join("broken");
    fs::create_dir_all(source.join("content")).unwrap();
    fs::write(source.join(MANIFEST_FILE), "template:\n  id: broken\n").unwrap();

    let err = build(&source, &temp.path().join("pkg")).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert!(err.to_string().contains("* author"));
    assert!(err.to_string().contains("* version"));
    assert!(!temp.path().join("pkg").exists());
}
