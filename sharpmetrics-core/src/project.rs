//! Project discovery: solutions, project files and loose directories

use crate::config::ResolvedConfig;
use crate::language::{is_csharp_source, LanguageParser};
use crate::semantic::Compilation;
use crate::syntax::SourceUnit;
use anyhow::{Context, Result};
use regex::Regex;
use std::path::{Path, PathBuf};

/// A named set of C# documents compiled together
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Project {
    pub name: String,
    pub documents: Vec<PathBuf>,
}

impl Project {
    /// Read and parse every document; unreadable or unparsable documents
    /// are skipped with a warning
    pub fn parse(&self, parser: &dyn LanguageParser) -> Vec<SourceUnit> {
        let mut units = Vec::with_capacity(self.documents.len());
        for path in &self.documents {
            let source = match std::fs::read_to_string(path) {
                Ok(source) => source,
                Err(e) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %e,
                        "skipping unreadable document"
                    );
                    continue;
                }
            };
            match parser.parse(&source, path) {
                Ok(unit) => units.push(unit),
                Err(e) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %e,
                        "skipping unparsable document"
                    );
                }
            }
        }
        tracing::debug!(project = %self.name, documents = units.len(), "project parsed");
        units
    }
}

/// Parse every project and bind them as one compilation
///
/// Each document keeps the assembly of its own project, so a type declared
/// in a sibling project resolves as source rather than as a library type.
pub fn compile_projects(projects: &[Project], parser: &dyn LanguageParser) -> Compilation {
    Compilation::from_projects(
        projects
            .iter()
            .map(|project| (project.name.clone(), project.parse(parser)))
            .collect(),
    )
}

/// Projects named by a path: a `.sln`, a `.csproj`, a `.cs` file or a directory
///
/// A path that does not exist yields no projects.
pub fn load_projects(path: &Path, config: &ResolvedConfig) -> Result<Vec<Project>> {
    if !path.exists() {
        tracing::warn!(path = %path.display(), "invalid path");
        return Ok(Vec::new());
    }

    if path.is_dir() {
        return load_directory(path, config);
    }

    match path.extension().and_then(|e| e.to_str()) {
        Some("sln") => load_solution(path, config),
        Some("csproj") => Ok(vec![load_project_file(path, config)?]),
        Some("cs") => Ok(vec![Project {
            name: file_stem(path),
            documents: vec![path.to_path_buf()],
        }]),
        _ => {
            tracing::warn!(path = %path.display(), "not a solution, project or C# file");
            Ok(Vec::new())
        }
    }
}

fn load_solution(path: &Path, config: &ResolvedConfig) -> Result<Vec<Project>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read solution: {}", path.display()))?;
    let base = path.parent().unwrap_or(Path::new("."));

    let mut entries = Vec::new();
    for (name, relative) in solution_entries(&content)? {
        let project_path = base.join(relative.replace('\\', "/"));
        if !project_path.is_file() {
            tracing::warn!(
                project = %name,
                path = %project_path.display(),
                "solution entry not found"
            );
            continue;
        }
        entries.push((name, project_path));
    }
    Ok(load_each(&entries, |(name, project_path)| {
        let mut project = load_project_file(project_path, config)?;
        project.name = name.clone();
        Ok(project)
    }))
}

/// Load every item, skipping the ones that fail with a warning
fn load_each<T: std::fmt::Debug>(
    items: &[T],
    load: impl Fn(&T) -> Result<Project>,
) -> Vec<Project> {
    items
        .iter()
        .filter_map(|item| match load(item) {
            Ok(project) => Some(project),
            Err(e) => {
                tracing::warn!(project = ?item, error = %e, "skipping project");
                None
            }
        })
        .collect()
}

/// `(name, relative path)` of every C# project listed in a solution
fn solution_entries(content: &str) -> Result<Vec<(String, String)>> {
    let pattern = Regex::new(r#"Project\("\{[^}]*\}"\)\s*=\s*"([^"]+)"\s*,\s*"([^"]+\.csproj)""#)
        .context("invalid solution entry pattern")?;
    Ok(pattern
        .captures_iter(content)
        .map(|captures| (captures[1].to_string(), captures[2].to_string()))
        .collect())
}

fn load_project_file(path: &Path, config: &ResolvedConfig) -> Result<Project> {
    let dir = path.parent().unwrap_or(Path::new("."));
    Ok(Project {
        name: file_stem(path),
        documents: collect_documents(dir, config)?,
    })
}

/// A solution at the top of the directory wins, then project files below
/// it, then the directory itself as one project
fn load_directory(dir: &Path, config: &ResolvedConfig) -> Result<Vec<Project>> {
    let mut solutions: Vec<PathBuf> = std::fs::read_dir(dir)
        .with_context(|| format!("Failed to read directory: {}", dir.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.is_file() && p.extension().is_some_and(|e| e == "sln"))
        .collect();
    solutions.sort();
    if let Some(solution) = solutions.first() {
        return load_solution(solution, config);
    }

    let mut project_files = Vec::new();
    collect_files_recursive(dir, &mut project_files, &is_project_file, &|_| true)?;
    project_files.sort();
    if !project_files.is_empty() {
        return Ok(load_each(&project_files, |project| {
            load_project_file(project, config)
        }));
    }

    let name = dir
        .canonicalize()
        .ok()
        .as_deref()
        .and_then(Path::file_name)
        .and_then(|n| n.to_str())
        .map(str::to_string)
        .unwrap_or_else(|| "Project".to_string());
    Ok(vec![Project {
        name,
        documents: collect_documents(dir, config)?,
    }])
}

/// Every included `.cs` file below `dir`, sorted
///
/// A subdirectory holding its own project file belongs to that project.
fn collect_documents(dir: &Path, config: &ResolvedConfig) -> Result<Vec<PathBuf>> {
    let mut documents = Vec::new();
    collect_files_recursive(dir, &mut documents, &is_csharp_source, &|sub| {
        !holds_project_file(sub)
    })?;
    documents.retain(|document| config.should_include(document));
    documents.sort();
    Ok(documents)
}

fn is_project_file(path: &Path) -> bool {
    path.extension().is_some_and(|e| e == "csproj")
}

fn holds_project_file(dir: &Path) -> bool {
    std::fs::read_dir(dir).is_ok_and(|entries| {
        entries
            .filter_map(|entry| entry.ok())
            .any(|entry| entry.path().is_file() && is_project_file(&entry.path()))
    })
}

/// Returns true for directory names that should not be traversed
fn is_skipped_dir(name: &str) -> bool {
    name.starts_with('.') || name == "bin" || name == "obj"
}

/// Recursively collect files accepted by `accept`, entering only the
/// subdirectories `descend` allows
fn collect_files_recursive(
    dir: &Path,
    files: &mut Vec<PathBuf>,
    accept: &dyn Fn(&Path) -> bool,
    descend: &dyn Fn(&Path) -> bool,
) -> Result<()> {
    for entry_result in std::fs::read_dir(dir)
        .with_context(|| format!("Failed to read directory: {}", dir.display()))?
    {
        let entry = entry_result?;
        let path = entry.path();
        let metadata = std::fs::symlink_metadata(&path)
            .with_context(|| format!("Failed to read metadata: {}", path.display()))?;

        if metadata.is_symlink() {
            continue;
        }
        if metadata.is_dir() {
            let skipped = path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(is_skipped_dir);
            if !skipped && descend(&path) {
                collect_files_recursive(&path, files, accept, descend)?;
            }
        } else if metadata.is_file() && accept(&path) {
            files.push(path);
        }
    }

    Ok(())
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::language::CSharpParser;
    use std::fs;

    fn write(path: &Path, content: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn test_solution_entries() {
        let sln = r#"
Microsoft Visual Studio Solution File, Format Version 12.00
Project("{FAE04EC0-301F-11D3-BF4B-00C04F79EFBC}") = "Core", "src\Core\Core.csproj", "{C1}"
EndProject
Project("{2150E333-8FDC-42A3-9474-1A3956D46DE8}") = "docs", "docs", "{D1}"
EndProject
Project("{9A19103F-16F7-4668-BE54-9A1E7A4F7556}") = "Web", "src/Web/Web.csproj", "{W1}"
EndProject
"#;
        let entries = solution_entries(sln).unwrap();
        assert_eq!(
            entries,
            vec![
                ("Core".to_string(), r"src\Core\Core.csproj".to_string()),
                ("Web".to_string(), "src/Web/Web.csproj".to_string()),
            ]
        );
    }

    #[test]
    fn test_invalid_path_yields_no_projects() {
        let config = ResolvedConfig::defaults().unwrap();
        let projects = load_projects(Path::new("/definitely/not/here.sln"), &config).unwrap();
        assert!(projects.is_empty());
    }

    #[test]
    fn test_project_file_skips_build_output() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        write(&root.join("App/App.csproj"), "<Project Sdk=\"Microsoft.NET.Sdk\" />");
        write(&root.join("App/Program.cs"), "class Program {}");
        write(&root.join("App/Models/Order.cs"), "class Order {}");
        write(&root.join("App/obj/Debug/Gen.cs"), "class Gen {}");
        write(&root.join("App/bin/Release/Out.cs"), "class Out {}");
        write(&root.join("App/.vs/Cache.cs"), "class Cache {}");

        let config = ResolvedConfig::defaults().unwrap();
        let projects = load_projects(&root.join("App/App.csproj"), &config).unwrap();
        assert_eq!(projects.len(), 1);
        assert_eq!(projects[0].name, "App");
        let names: Vec<_> = projects[0]
            .documents
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["Order.cs", "Program.cs"]);
    }

    #[test]
    fn test_solution_names_projects() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        write(
            &root.join("Shop.sln"),
            concat!(
                "Project(\"{FAE04EC0-301F-11D3-BF4B-00C04F79EFBC}\") = \"ShopCore\", ",
                "\"Core\\Core.csproj\", \"{A}\"\nEndProject\n",
            ),
        );
        write(&root.join("Core/Core.csproj"), "<Project />");
        write(&root.join("Core/Cart.cs"), "class Cart {}");

        let config = ResolvedConfig::defaults().unwrap();
        let projects = load_projects(root, &config).unwrap();
        assert_eq!(projects.len(), 1);
        assert_eq!(projects[0].name, "ShopCore");
        assert_eq!(projects[0].documents.len(), 1);
    }

    #[test]
    fn test_nested_project_owns_its_directory() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        write(&root.join("Main.csproj"), "<Project />");
        write(&root.join("Program.cs"), "class Program {}");
        write(&root.join("Models/Order.cs"), "class Order {}");
        write(&root.join("Tests/Tests.csproj"), "<Project />");
        write(&root.join("Tests/OrderTests.cs"), "class OrderTests {}");
        write(&root.join("Tests/Unit/MoreTests.cs"), "class MoreTests {}");

        let config = ResolvedConfig::defaults().unwrap();
        let projects = load_projects(root, &config).unwrap();
        let layout: Vec<(String, Vec<String>)> = projects
            .iter()
            .map(|project| {
                let names = project
                    .documents
                    .iter()
                    .map(|p| p.file_name().unwrap().to_str().unwrap().to_string())
                    .collect();
                (project.name.clone(), names)
            })
            .collect();
        assert_eq!(
            layout,
            vec![
                (
                    "Main".to_string(),
                    vec!["Order.cs".to_string(), "Program.cs".to_string()]
                ),
                (
                    "Tests".to_string(),
                    vec!["OrderTests.cs".to_string(), "MoreTests.cs".to_string()]
                ),
            ]
        );
    }

    #[test]
    fn test_failing_project_does_not_drop_siblings() {
        let items = vec!["Good", "Broken", "Other"];
        let projects = load_each(&items, |name| {
            if *name == "Broken" {
                anyhow::bail!("Failed to read directory: {name}");
            }
            Ok(Project {
                name: name.to_string(),
                documents: Vec::new(),
            })
        });
        let names: Vec<&str> = projects.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Good", "Other"]);
    }

    #[test]
    fn test_unreadable_project_directory_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        write(&root.join("Good/Good.csproj"), "<Project />");
        write(&root.join("Good/Cart.cs"), "class Cart {}");
        let missing = root.join("Gone/Gone.csproj");

        let config = ResolvedConfig::defaults().unwrap();
        let entries = vec![root.join("Good/Good.csproj"), missing];
        let projects = load_each(&entries, |path| load_project_file(path, &config));
        assert_eq!(projects.len(), 1);
        assert_eq!(projects[0].name, "Good");
        assert_eq!(projects[0].documents.len(), 1);
    }

    #[test]
    fn test_overly_deep_document_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let deep = dir.path().join("Deep.cs");
        let fine = dir.path().join("Fine.cs");
        let terms = vec!["\"a\""; 5000].join(" + ");
        write(&deep, &format!("class Deep {{ string S = {terms}; }}"));
        write(&fine, "class Fine { void Go() { } }");

        let project = Project {
            name: "Mixed".to_string(),
            documents: vec![deep, fine.clone()],
        };
        let units = project.parse(&CSharpParser::new().unwrap());
        assert_eq!(units.len(), 1);
        assert_eq!(units[0].path, fine);
    }

    #[test]
    fn test_loose_directory_is_one_project() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("Scratch");
        write(&root.join("B.cs"), "class B {}");
        write(&root.join("sub/A.cs"), "class A {}");
        write(&root.join("notes.txt"), "not code");

        let config = ResolvedConfig::defaults().unwrap();
        let projects = load_projects(&root, &config).unwrap();
        assert_eq!(projects.len(), 1);
        assert_eq!(projects[0].name, "Scratch");
        assert_eq!(projects[0].documents.len(), 2);
    }

    #[test]
    fn test_single_file_project() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("Solo.cs");
        write(&file, "class Solo {}");

        let config = ResolvedConfig::defaults().unwrap();
        let projects = load_projects(&file, &config).unwrap();
        assert_eq!(
            projects,
            vec![Project {
                name: "Solo".to_string(),
                documents: vec![file],
            }]
        );
    }
}
