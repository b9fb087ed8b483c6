use crate::output::{Output, OutputFormat};
use crate::StatKind;
use color_eyre::Result;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use media_stat_config::PathManager;
use media_stat_core::store::{LibraryRepository, StatisticsRepository};
use media_stat_core::SnapshotStorage;
use media_stat_models::{
    Library, MovieStatistics, MovieSummary, ShowStatistics, Statistic, StatisticKind, StatisticPayload,
    TICKS_PER_MINUTE,
};
use serde_json::json;
use std::collections::BTreeSet;

impl From<StatKind> for StatisticKind {
    fn from(kind: StatKind) -> Self {
        match kind {
            StatKind::Movie => StatisticKind::Movie,
            StatKind::Show => StatisticKind::Show,
        }
    }
}

pub fn run_stats(kind: StatKind, libraries: Vec<String>, list_libraries: bool, output: &Output) -> Result<()> {
    let snapshot = SnapshotStorage::new(PathManager::default().catalog_file());
    if !snapshot.exists() {
        output.warn("No catalog found. Run 'mediastat sync' first.");
        return Ok(());
    }
    let store = snapshot.load()?;

    if list_libraries {
        let libraries = store.libraries()?;
        print_libraries(&libraries, output);
        return Ok(());
    }

    let kind = StatisticKind::from(kind);
    let collection_ids: BTreeSet<String> = libraries.into_iter().collect();
    match store.find_statistic(kind, &collection_ids)? {
        Some(statistic) => print_statistic(&statistic, output)?,
        None => output.warn(format!(
            "No {} statistic cached for libraries [{}]. Check the ids with --list-libraries or run a sync.",
            kind,
            collection_ids.iter().cloned().collect::<Vec<_>>().join(", ")
        )),
    }
    Ok(())
}

fn print_libraries(libraries: &[Library], output: &Output) {
    if !output.is_human() {
        output.json(&json!({ "libraries": libraries }));
        return;
    }
    if libraries.is_empty() {
        output.info("No libraries in the catalog");
        return;
    }
    let mut table = new_table(&["Id", "Name", "Type"]);
    for library in libraries {
        table.add_row(vec![
            library.id.clone(),
            library.name.clone(),
            library.library_type.as_collection_type().to_string(),
        ]);
    }
    output.info(table.to_string());
}

fn print_statistic(statistic: &Statistic, output: &Output) -> Result<()> {
    if output.format() != OutputFormat::Human {
        output.json(&serde_json::to_value(statistic)?);
        return Ok(());
    }

    let scope = if statistic.collection_ids.is_empty() {
        "all libraries".to_string()
    } else {
        statistic.collection_ids.iter().cloned().collect::<Vec<_>>().join(", ")
    };
    output.info(format!(
        "{} statistics for {} (calculated {})",
        statistic.kind,
        scope,
        statistic.calculated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));

    let table = match &statistic.payload {
        StatisticPayload::Movie(stats) => movie_table(stats),
        StatisticPayload::Show(stats) => show_table(stats),
    };
    output.info(table.to_string());
    Ok(())
}

fn movie_table(stats: &MovieStatistics) -> Table {
    let mut table = new_table(&["Metric", "Value"]);
    table.add_row(vec!["Movies".to_string(), stats.movie_count.to_string()]);
    table.add_row(vec!["Total run time".to_string(), format_ticks(stats.total_run_time_ticks)]);
    table.add_row(vec!["Mean run time".to_string(), optional(stats.mean_run_time_minutes.map(|m| format!("{:.0} min", m)))]);
    table.add_row(vec!["Mean rating".to_string(), optional(stats.mean_community_rating.map(|r| format!("{:.1}", r)))]);
    table.add_row(vec!["Highest rated".to_string(), summary(stats.highest_rated.as_ref())]);
    table.add_row(vec!["Oldest".to_string(), summary(stats.oldest_premiere.as_ref())]);
    table.add_row(vec!["Newest".to_string(), summary(stats.newest_premiere.as_ref())]);
    table.add_row(vec!["Without IMDb id".to_string(), stats.without_imdb_id.to_string()]);
    table.add_row(vec!["Top genres".to_string(), top_genres(&stats.genres)]);
    table
}

fn show_table(stats: &ShowStatistics) -> Table {
    let mut table = new_table(&["Metric", "Value"]);
    table.add_row(vec!["Shows".to_string(), stats.show_count.to_string()]);
    table.add_row(vec!["Seasons".to_string(), stats.season_count.to_string()]);
    table.add_row(vec!["Episodes".to_string(), stats.episode_count.to_string()]);
    table.add_row(vec!["Missing episodes".to_string(), stats.missing_episode_count.to_string()]);
    table.add_row(vec!["Complete shows".to_string(), stats.complete_show_count.to_string()]);
    table.add_row(vec!["Metadata lookups failed".to_string(), stats.metadata_failed_count.to_string()]);
    table.add_row(vec!["Total run time".to_string(), format_ticks(stats.total_run_time_ticks)]);
    table.add_row(vec!["Top genres".to_string(), top_genres(&stats.genres)]);
    table
}

fn new_table(header: &[&str]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header.to_vec());
    table
}

fn optional(value: Option<String>) -> String {
    value.unwrap_or_else(|| "-".to_string())
}

fn summary(movie: Option<&MovieSummary>) -> String {
    match movie {
        Some(m) => match m.production_year {
            Some(year) => format!("{} ({})", m.name, year),
            None => m.name.clone(),
        },
        None => "-".to_string(),
    }
}

fn top_genres(genres: &[media_stat_models::GenreCount]) -> String {
    if genres.is_empty() {
        return "-".to_string();
    }
    genres
        .iter()
        .take(5)
        .map(|g| format!("{} ({})", g.genre, g.count))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Render a tick duration as days, hours and minutes
fn format_ticks(ticks: i64) -> String {
    let total_minutes = ticks.max(0) / TICKS_PER_MINUTE;
    let days = total_minutes / (24 * 60);
    let hours = (total_minutes / 60) % 24;
    let minutes = total_minutes % 60;
    if days > 0 {
        format!("{}d {}h {}m", days, hours, minutes)
    } else {
        format!("{}h {}m", hours, minutes)
    }
}
