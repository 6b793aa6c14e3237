//! Sample "Manufacturing" dashboard and the production data behind it

use std::path::{Path, PathBuf};

use anyhow::Result;
use chrono::{Duration, TimeZone, Utc};
use ds_core::model::{CsvItem, LocalFileItem};
use ds_core::{ChartType, DashboardModel, DataSourceItem, FilterModel, WidgetModel};
use ds_data::LocalFileStore;
use tracing::info;

pub const SAMPLE_DASHBOARD_ID: &str = "manufacturing";
pub const SAMPLE_VALUES_FILE: &str = "production.csv";

const PLANTS: [&str; 3] = ["Austin", "Monterrey", "Shenzhen"];
const LINES: [&str; 4] = ["L1", "L2", "L3", "L4"];
const SHIFTS: [&str; 3] = ["Morning", "Afternoon", "Night"];
const DAYS: i64 = 14;

/// Document model of the sample dashboard
pub fn manufacturing_dashboard() -> DashboardModel {
    let mut model = DashboardModel::new("Manufacturing");
    model.description = "Daily output, defects and downtime per plant".to_string();

    model.data_sources.push(DataSourceItem::Csv(CsvItem {
        id: "production".to_string(),
        title: "Production metrics".to_string(),
        file: LocalFileItem {
            id: "production-file".to_string(),
            title: SAMPLE_VALUES_FILE.to_string(),
            uri: format!("local:/{}", SAMPLE_VALUES_FILE),
        },
        has_header: true,
    }));

    for (id, title, field) in [("plant", "Plant", "plant"), ("line", "Line", "line_id")] {
        let mut filter = FilterModel::new(id, title, field);
        filter.data_source_id = Some("production".to_string());
        model.filters.push(filter);
    }
    model
        .filters
        .push(FilterModel::date("production-date", "Production Date", "timestamp"));

    let widgets = [
        WidgetModel::new("units", "Units by Plant", ChartType::ColumnChart).with_quick_filter("shift"),
        WidgetModel::new("defects", "Defect Rate", ChartType::LineChart).with_quick_filter("line_id"),
        WidgetModel::new("downtime", "Downtime", ChartType::Grid),
    ];
    for mut widget in widgets {
        widget.data_source_id = Some("production".to_string());
        model.widgets.push(widget);
    }

    model
}

/// Write the production CSV serving the sample's value domains
pub fn write_production_csv(path: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(["timestamp", "plant", "line_id", "shift", "products_made", "defects", "downtime_minutes"])?;

    let start = Utc.with_ymd_and_hms(2024, 3, 1, 6, 0, 0).single().unwrap_or_else(Utc::now);
    let mut seq: u64 = 0;
    for day in 0..DAYS {
        for (p, plant) in PLANTS.iter().enumerate() {
            for line in LINES.iter().take(p + 2) {
                for (s, shift) in SHIFTS.iter().enumerate() {
                    seq += 1;
                    let timestamp = start + Duration::days(day) + Duration::hours(8 * s as i64);
                    let made = 400 + (seq * 37) % 180;
                    let defects = (seq * 13) % 11;
                    let downtime = (seq * 7) % 45;
                    writer.write_record([
                        timestamp.to_rfc3339(),
                        plant.to_string(),
                        line.to_string(),
                        shift.to_string(),
                        made.to_string(),
                        defects.to_string(),
                        downtime.to_string(),
                    ])?;
                }
            }
        }
    }
    writer.flush()?;
    Ok(())
}

/// Store the sample dashboard and its CSV; returns the CSV path
pub async fn install(store: &LocalFileStore) -> Result<PathBuf> {
    let path = store.write_model(SAMPLE_DASHBOARD_ID, &manufacturing_dashboard()).await?;
    info!(path = %path.display(), "sample dashboard written");

    let csv_path = store.config().storage_path.join(SAMPLE_VALUES_FILE);
    let target = csv_path.clone();
    tokio::task::spawn_blocking(move || write_production_csv(&target)).await??;
    info!(path = %csv_path.display(), "sample production data written");

    Ok(csv_path)
}
