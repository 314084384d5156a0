//! Command handlers. Each takes its inputs explicitly so it can run against
//! any store slot and any writer.

use std::fs;
use std::io::{self, Read, Write};
use std::path::Path;

use anyhow::{bail, Context, Result};
use pulse_core::profile::{ParamValue, ProfileId, StoredProfile};
use pulse_core::scene::{Primitive, Scene};
use pulse_core::segment::{ParsedProfile, SegmentIssue};
use pulse_core::store::{ProfileStore, StorageSlot};
use pulse_core::timeline::Canvas;
use pulse_core::PulseError;
use serde::Serialize;

use crate::cli::{FormatArg, ProfilesCommand, RenderArgs};

/// JSON output of a render
#[derive(Serialize)]
struct RenderReport<'a> {
    canvas: Canvas,
    primitives: &'a [Primitive],
    skipped: &'a [SegmentIssue],
}

/// Draw a parsed profile and encode it in the requested format.
pub fn render_profile(parsed: &ParsedProfile, args: &RenderArgs) -> Result<String> {
    let canvas = args.canvas();
    for (field, value) in [("width", canvas.width), ("height", canvas.height)] {
        if !(value.is_finite() && value > 0.0) {
            let reason = "Canvas size must be positive";
            return Err(PulseError::invalid_input(field, value.to_string(), reason).into());
        }
    }

    let mut scene = Scene::new(canvas);
    scene.draw(&parsed.profile, args.layout_mode());
    if let Some(title) = &args.title {
        scene.annotate(4.0, 14.0, title.clone());
    }
    if parsed.profile.is_degenerate() {
        log::info!("Profile has no drawable duration; output is empty");
    }

    match args.format {
        FormatArg::Svg => Ok(scene.to_svg()),
        FormatArg::Json => {
            let report = RenderReport {
                canvas,
                primitives: scene.primitives(),
                skipped: &parsed.issues,
            };
            Ok(serde_json::to_string_pretty(&report)?)
        }
    }
}

/// Read the segment array from `input`, or stdin for `None` / "-".
pub fn read_segments(input: Option<&Path>) -> Result<ParsedProfile> {
    let raw = match input {
        Some(path) if path != Path::new("-") => fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?,
        _ => {
            let mut raw = String::new();
            io::stdin()
                .read_to_string(&mut raw)
                .context("Failed to read segments from stdin")?;
            raw
        }
    };
    Ok(ParsedProfile::from_json(&raw)?)
}

/// Write to `path`, or stdout when there is none.
pub fn write_output(path: Option<&Path>, contents: &[u8]) -> Result<()> {
    match path {
        Some(path) => {
            fs::write(path, contents)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            log::info!("Wrote {}", path.display());
        }
        None => {
            let mut stdout = io::stdout().lock();
            stdout.write_all(contents)?;
            stdout.flush()?;
        }
    }
    Ok(())
}

/// Resolve a profile reference: an id, or a name matching exactly one profile.
pub fn resolve_profile<S: StorageSlot>(
    store: &mut ProfileStore<S>,
    reference: &str,
) -> Result<ProfileId> {
    if let Ok(id) = reference.parse::<ProfileId>() {
        if store.find(id)?.is_some() {
            return Ok(id);
        }
    }

    let matches = store.find_by_name(reference)?;
    match matches.as_slice() {
        [] => Err(PulseError::profile_not_found(reference).into()),
        [only] => Ok(only.id),
        many => {
            let ids: Vec<String> = many.iter().map(|p| p.id.to_string()).collect();
            bail!(
                "'{}' matches {} profiles; use an id instead: {}",
                reference,
                many.len(),
                ids.join(", ")
            )
        }
    }
}

/// Run a `profiles` subcommand, writing human output to `out`.
pub fn run_profiles<S: StorageSlot>(
    store: &mut ProfileStore<S>,
    command: ProfilesCommand,
    out: &mut impl Write,
) -> Result<()> {
    match command {
        ProfilesCommand::List { json } => {
            if json {
                out.write_all(&store.export_all()?)?;
                writeln!(out)?;
            } else {
                write!(out, "{}", format_table(store.list()?))?;
            }
        }
        ProfilesCommand::Show { profile } => {
            let id = resolve_profile(store, &profile)?;
            let found = store.find(id)?.ok_or_else(|| PulseError::profile_not_found(id))?;
            writeln!(out, "{}", serde_json::to_string_pretty(&redacted(found))?)?;
        }
        ProfilesCommand::Save { name, params, operator } => {
            let mut profile = StoredProfile::new(name, params.to_params());
            profile.email = operator.email;
            profile.age = operator.age.map(ParamValue::from);
            profile.username = operator.username;
            let id = profile.id;
            let count = store.save(profile)?.len();
            writeln!(out, "Saved {} ({} profiles)", id, count)?;
        }
        ProfilesCommand::Delete { profile } => {
            let id = resolve_profile(store, &profile)?;
            let count = store.delete(id)?.len();
            writeln!(out, "Deleted {} ({} profiles left)", id, count)?;
        }
        ProfilesCommand::Edit { profile, name, params, operator } => {
            let id = resolve_profile(store, &profile)?;
            let mut edit = params.to_edit();
            edit.name = name;
            edit.email = operator.email;
            edit.age = operator.age.map(ParamValue::from);
            edit.username = operator.username;
            if edit.is_empty() {
                bail!("Nothing to change: pass at least one field to edit");
            }
            store.begin_edit(id)?;
            if let Err(e) = store.commit_edit(edit) {
                store.cancel_edit();
                return Err(e.into());
            }
            writeln!(out, "Updated {}", id)?;
        }
        ProfilesCommand::Import { file } => {
            let raw =
                fs::read(&file).with_context(|| format!("Failed to read {}", file.display()))?;
            let count = store.import_all(&raw)?.len();
            writeln!(out, "Imported {} profiles from {}", count, file.display())?;
        }
        ProfilesCommand::Export { file } => {
            let bytes = store.export_all()?;
            match file {
                Some(path) => {
                    write_output(Some(&path), &bytes)?;
                    let count = store.list()?.len();
                    writeln!(out, "Exported {} profiles to {}", count, path.display())?;
                }
                None => {
                    out.write_all(&bytes)?;
                    writeln!(out)?;
                }
            }
        }
    }
    Ok(())
}

/// Copy of `profile` safe to print
fn redacted(profile: &StoredProfile) -> StoredProfile {
    let mut copy = profile.clone();
    if copy.password.is_some() {
        copy.password = Some("<redacted>".to_string());
    }
    copy
}

/// Plain-text table of saved profiles
pub fn format_table(profiles: &[StoredProfile]) -> String {
    if profiles.is_empty() {
        return "No saved profiles\n".to_string();
    }

    let name_width = profiles
        .iter()
        .map(|p| p.name.chars().count())
        .max()
        .unwrap_or(0)
        .max("NAME".len());

    let mut table = format!(
        "{:<36}  {:<name_width$}  {:>6} {:>6} {:>6} {:>6}  {:<5}  {}\n",
        "ID", "NAME", "T1", "T2", "T3", "T4", "BURST", "POLARITY"
    );
    for p in profiles {
        table.push_str(&format!(
            "{:<36}  {:<name_width$}  {:>6} {:>6} {:>6} {:>6}  {:<5}  {}\n",
            p.id.to_string(),
            p.name,
            p.t1.to_string(),
            p.t2.to_string(),
            p.t3.to_string(),
            p.t4.to_string(),
            p.burst,
            p.polarity
        ));
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{ModeArg, OperatorArgs, ParamArgs};
    use pulse_core::profile::{GeneratorParams, Polarity};
    use pulse_core::store::MemorySlot;

    fn render_args(format: FormatArg, mode: ModeArg) -> RenderArgs {
        RenderArgs {
            mode,
            width: 800.0,
            height: 200.0,
            format,
            title: None,
            output: None,
        }
    }

    fn example() -> ParsedProfile {
        ParsedProfile::from_json(
            r#"[
                {"type": "Positive Pulse", "duration": 100},
                {"type": "Negative Pulse", "duration": 300},
                {"type": "Rest", "duration": 100},
                {"type": "Rest"}
            ]"#,
        )
        .unwrap()
    }

    fn store_with(names: &[&str]) -> ProfileStore<MemorySlot> {
        let mut store = ProfileStore::new(MemorySlot::default());
        for name in names {
            store
                .save(StoredProfile::new(
                    *name,
                    GeneratorParams::new("1", "2", "3", "4", false, Polarity::Bipolar),
                ))
                .unwrap();
        }
        store
    }

    fn run(store: &mut ProfileStore<MemorySlot>, command: ProfilesCommand) -> Result<String> {
        let mut out = Vec::new();
        run_profiles(store, command, &mut out)?;
        Ok(String::from_utf8(out).unwrap())
    }

    #[test]
    fn test_render_json_report() {
        let args = render_args(FormatArg::Json, ModeArg::Timeline);
        let json = render_profile(&example(), &args).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        let primitives = value["primitives"].as_array().unwrap();
        assert_eq!(primitives.len(), 3);
        assert_eq!(primitives[1]["x"], 160.0);
        assert_eq!(primitives[1]["width"], 480.0);
        assert_eq!(primitives[1]["fill"], "red");
        assert_eq!(value["skipped"][0]["index"], 3);
    }

    #[test]
    fn test_render_svg_with_title() {
        let mut args = render_args(FormatArg::Svg, ModeArg::Bars);
        args.title = Some("Session 1".to_string());
        let svg = render_profile(&example(), &args).unwrap();
        assert_eq!(svg.matches("<rect").count(), 3);
        assert!(svg.contains("Session 1"));
    }

    #[test]
    fn test_render_rejects_bad_canvas() {
        let mut args = render_args(FormatArg::Svg, ModeArg::Timeline);
        args.width = 0.0;
        assert!(render_profile(&example(), &args).is_err());
    }

    #[test]
    fn test_resolve_by_name_and_id() {
        let mut store = store_with(&["A", "B", "B"]);
        let a_id = store.list().unwrap()[0].id;

        assert_eq!(resolve_profile(&mut store, "A").unwrap(), a_id);
        assert_eq!(resolve_profile(&mut store, &a_id.to_string()).unwrap(), a_id);
        assert!(resolve_profile(&mut store, "B").unwrap_err().to_string().contains("matches 2"));
        assert!(resolve_profile(&mut store, "C").is_err());
    }

    #[test]
    fn test_save_list_delete() {
        let mut store = store_with(&[]);
        run(
            &mut store,
            ProfilesCommand::Save {
                name: "A".to_string(),
                params: ParamArgs {
                    t1: Some("10".to_string()),
                    ..ParamArgs::default()
                },
                operator: OperatorArgs {
                    email: Some("op@example.com".to_string()),
                    ..OperatorArgs::default()
                },
            },
        )
        .unwrap();
        assert_eq!(store.list().unwrap()[0].email.as_deref(), Some("op@example.com"));

        let table = run(&mut store, ProfilesCommand::List { json: false }).unwrap();
        assert!(table.starts_with("ID"));
        assert!(table.contains(" A "));

        run(&mut store, ProfilesCommand::Delete { profile: "A".to_string() }).unwrap();
        let table = run(&mut store, ProfilesCommand::List { json: false }).unwrap();
        assert_eq!(table, "No saved profiles\n");
    }

    #[test]
    fn test_edit_command() {
        let mut store = store_with(&["A"]);
        run(
            &mut store,
            ProfilesCommand::Edit {
                profile: "A".to_string(),
                name: Some("A2".to_string()),
                params: ParamArgs {
                    t3: Some("30".to_string()),
                    ..ParamArgs::default()
                },
                operator: OperatorArgs::default(),
            },
        )
        .unwrap();

        let edited = &store.list().unwrap()[0];
        assert_eq!(edited.name, "A2");
        assert_eq!(edited.t3, ParamValue::from("30"));
        assert_eq!(edited.t1, ParamValue::from("1"));
        assert_eq!(store.editing(), None);
    }

    #[test]
    fn test_empty_edit_is_rejected() {
        let mut store = store_with(&["A"]);
        let result = run(
            &mut store,
            ProfilesCommand::Edit {
                profile: "A".to_string(),
                name: None,
                params: ParamArgs::default(),
                operator: OperatorArgs::default(),
            },
        );
        assert!(result.is_err());
        assert_eq!(store.editing(), None);
    }

    #[test]
    fn test_show_redacts_password() {
        let raw = br#"[{
            "name": "old", "T1": "1", "T2": "2", "T3": "3", "T4": "4",
            "polarity": "B", "burst": false, "password": "hunter2"
        }]"#;
        let mut store = store_with(&[]);
        store.import_all(raw).unwrap();

        let shown = run(&mut store, ProfilesCommand::Show { profile: "old".to_string() }).unwrap();
        assert!(!shown.contains("hunter2"));
        assert!(shown.contains("<redacted>"));
    }

    #[test]
    fn test_export_to_stdout_matches_store() {
        let mut store = store_with(&["A", "B"]);
        let exported = run(&mut store, ProfilesCommand::Export { file: None }).unwrap();
        let expected = String::from_utf8(store.export_all().unwrap()).unwrap();
        assert_eq!(exported.trim_end(), expected);
    }

    #[test]
    fn test_import_and_export_files() {
        let dir = std::env::temp_dir().join(format!("pulsetrace_cli_{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let export_path = dir.join("export.json");

        let mut source = store_with(&["A", "B"]);
        run(&mut source, ProfilesCommand::Export { file: Some(export_path.clone()) }).unwrap();

        let mut target = store_with(&["old"]);
        let import = ProfilesCommand::Import {
            file: export_path.clone(),
        };
        let message = run(&mut target, import).unwrap();
        assert!(message.starts_with("Imported 2 profiles"));
        assert_eq!(target.list().unwrap(), source.list().unwrap());

        let bad_path = dir.join("bad.json");
        fs::write(&bad_path, b"not json").unwrap();
        assert!(run(&mut target, ProfilesCommand::Import { file: bad_path }).is_err());
        assert_eq!(target.list().unwrap().len(), 2);

        let _ = fs::remove_dir_all(&dir);
    }
}
