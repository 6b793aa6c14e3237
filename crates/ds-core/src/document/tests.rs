use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::Notify;
use uuid::Uuid;

use super::*;
use crate::data::{DashboardLoader, ValueDomainProvider};
use crate::filter::{DateRange, DateRule, FilterScalar, FilterValue, PeriodRelation, PeriodType};
use crate::model::ChartType;

#[derive(Default)]
struct RecordingView {
    id: Uuid,
    selections: Mutex<Vec<FilterSelectionChange>>,
    structures: Mutex<Vec<StructureChange>>,
}

impl RecordingView {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            id: Uuid::new_v4(),
            ..Default::default()
        })
    }

    fn attach(self: &Arc<Self>, dashboard: &Arc<Dashboard>) -> ViewAttachment {
        let view: Arc<dyn DashboardView> = self.clone();
        dashboard.subscribe(&view)
    }
}

impl DashboardView for RecordingView {
    fn view_id(&self) -> ViewId {
        self.id
    }

    fn on_filter_selection_changed(&self, change: &FilterSelectionChange) -> anyhow::Result<()> {
        self.selections.lock().push(change.clone());
        Ok(())
    }

    fn on_structure_changed(&self, change: &StructureChange) -> anyhow::Result<()> {
        self.structures.lock().push(change.clone());
        Ok(())
    }
}

struct StaticLoader;

#[async_trait]
impl DashboardLoader for StaticLoader {
    async fn fetch(&self, dashboard_id: &str) -> Result<DashboardModel, LoadError> {
        match dashboard_id {
            "sales" => Ok(sales_model()),
            other => Err(LoadError::new(format!("dashboard '{}' not found", other))),
        }
    }
}

struct StaticDomain;

#[async_trait]
impl ValueDomainProvider for StaticDomain {
    async fn filter_values(&self, target: &FilterTarget) -> anyhow::Result<Vec<FilterValue>> {
        match target.field_name() {
            "country" => Ok(["US", "EU", "JP"].into_iter().map(|v| FilterValue::new(v, v)).collect()),
            other => anyhow::bail!("no values for field '{}'", other),
        }
    }
}

fn sales_model() -> DashboardModel {
    let mut model = DashboardModel::new("Sales");
    model.filters.push(FilterModel::new("f1", "Country", "country"));
    model.filters.push(FilterModel::new("f2", "Product", "product"));
    model.filters.push(FilterModel::date("d1", "Order Date", "order_date"));
    model
        .widgets
        .push(WidgetModel::new("w1", "Revenue by Region", ChartType::ColumnChart).with_quick_filter("Region"));
    model.widgets.push(WidgetModel::new("w2", "Orders", ChartType::Grid));
    model
}

fn context() -> Arc<SdkContext> {
    SdkContext::builder()
        .loader(Arc::new(StaticLoader))
        .value_domain(Arc::new(StaticDomain))
        .build()
}

fn sales() -> Arc<Dashboard> {
    Dashboard::from_model(context(), sales_model()).unwrap()
}

#[test]
fn test_get_by_id_and_title() {
    let dashboard = sales();
    let filters = dashboard.filters();

    assert_eq!(filters.len(), 3);
    assert_eq!(filters.get_by_id("f1").unwrap().title(), "Country");
    assert!(filters.get_by_id("missing").is_none());
    assert_eq!(filters.get_by_title("Product").unwrap().id(), "f2");
    assert!(filters.get_by_title("product").is_none());
    assert_eq!(filters.get(2).unwrap().id(), "d1");
    assert!(filters.get(3).is_none());

    let visualizations = dashboard.visualizations();
    assert_eq!(visualizations.get_by_title("Orders").unwrap().id(), "w2");
}

#[test]
fn test_value_edit_from_view_skips_origin() {
    let dashboard = sales();
    let views: Vec<_> = (0..3).map(|_| RecordingView::new()).collect();
    let attachments: Vec<_> = views.iter().map(|v| v.attach(&dashboard)).collect();

    let selection = FilterValueSet::selected(["US", "EU"]);
    let report = attachments[0]
        .update_filter_selection("f1", selection.clone())
        .unwrap();

    assert_eq!(report.delivered, 2);
    assert!(views[0].selections.lock().is_empty());
    for view in &views[1..] {
        let seen = view.selections.lock();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].filter, FilterIdentity::global("f1"));
        assert_eq!(seen[0].selection, selection);
    }
    assert!(dashboard.has_pending_changes());
}

#[test]
fn test_quick_filter_edit_reaches_other_views() {
    let dashboard = sales();
    let a = RecordingView::new();
    let b = RecordingView::new();
    let attachment_a = a.attach(&dashboard);
    let _attachment_b = b.attach(&dashboard);

    attachment_a
        .update_quick_filter_selection("w1", "Region", FilterValueSet::selected(["US", "EU"]))
        .unwrap();

    assert!(a.selections.lock().is_empty());
    let seen = b.selections.lock();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].filter, FilterIdentity::quick("w1", "Region"));

    let quick = dashboard.visualizations().get_by_id("w1").unwrap().filters().unwrap();
    let region = quick.get_by_field_name("Region").unwrap();
    assert_eq!(
        region.selected_values().unwrap(),
        vec![FilterScalar::from("US"), FilterScalar::from("EU")]
    );
}

#[test]
fn test_unknown_identity_fails_without_fan_out() {
    let dashboard = sales();
    let a = RecordingView::new();
    let b = RecordingView::new();
    let attachment_a = a.attach(&dashboard);
    let _attachment_b = b.attach(&dashboard);

    let err = attachment_a
        .update_filter_selection("missing", FilterValueSet::selected(["US"]))
        .unwrap_err();
    assert_eq!(err, DashboardError::UnknownFilterIdentity(FilterIdentity::global("missing")));

    let err = attachment_a
        .update_quick_filter_selection("w2", "Region", FilterValueSet::selected(["US"]))
        .unwrap_err();
    assert!(matches!(err, DashboardError::UnknownFilterIdentity(_)));

    assert!(b.selections.lock().is_empty());
    assert!(!dashboard.has_pending_changes());
}

#[test]
fn test_structural_edit_notifies_every_view() {
    let dashboard = sales();
    let views: Vec<_> = (0..3).map(|_| RecordingView::new()).collect();
    let attachments: Vec<_> = views.iter().map(|v| v.attach(&dashboard)).collect();

    let flips = Arc::new(Mutex::new(Vec::new()));
    let recorded = flips.clone();
    dashboard.set_on_has_pending_changes_changed(Some(Arc::new(move |pending: bool| recorded.lock().push(pending))));

    assert!(!dashboard.has_pending_changes());
    attachments[1]
        .add_visualization(Some(0), WidgetModel::new("w3", "Margin", ChartType::PieChart))
        .unwrap();

    assert!(dashboard.has_pending_changes());
    assert_eq!(flips.lock().as_slice(), &[true]);
    for view in &views {
        let seen = view.structures.lock();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].kind, StructureChangeKind::VisualizationAdded { index: 0 });
        assert_eq!(seen[0].snapshot.visualizations.len(), 3);
        assert_eq!(seen[0].snapshot.visualizations[0].id, "w3");
    }
}

#[test]
fn test_repeated_edits_fan_out_each_time() {
    let dashboard = sales();
    let a = RecordingView::new();
    let b = RecordingView::new();
    let attachment_a = a.attach(&dashboard);
    let _attachment_b = b.attach(&dashboard);

    for _ in 0..2 {
        attachment_a
            .update_filter_selection("f2", FilterValueSet::selected(["Bikes"]))
            .unwrap();
    }

    assert_eq!(b.selections.lock().len(), 2);
    assert_eq!(
        dashboard.filters().get_by_id("f2").unwrap().selected_values().unwrap(),
        vec![FilterScalar::from("Bikes")]
    );
}

#[test]
fn test_handle_setters_notify_all_views() {
    let dashboard = sales();
    let a = RecordingView::new();
    let _attachment = a.attach(&dashboard);

    let country = dashboard.filters().get_by_id("f1").unwrap();
    country.set_selected_values(vec!["JP".into()]).unwrap();

    assert_eq!(a.selections.lock().len(), 1);
    // A second handle onto the same filter sees the edit
    let again = dashboard.filters().get_by_title("Country").unwrap();
    assert_eq!(again.selected_values().unwrap(), vec![FilterScalar::from("JP")]);
}

#[test]
fn test_empty_selection_is_unrestricted() {
    let dashboard = sales();
    let country = dashboard.filters().get_by_id("f1").unwrap();

    assert!(country.selected_values().unwrap().is_empty());
    assert!(country.selection().unwrap().is_unrestricted());

    country
        .set_selected_values(vec!["US".into(), "EU".into(), "JP".into()])
        .unwrap();
    assert!(!country.selection().unwrap().is_unrestricted());
}

#[test]
fn test_set_selected_values_rejected_outside_selected_mode() {
    let dashboard = sales();
    let country = dashboard.filters().get_by_id("f1").unwrap();
    country.set_selection(FilterValueSet::EmptyValues).unwrap();

    let err = country.set_selected_values(vec!["US".into()]).unwrap_err();
    assert!(matches!(err, DashboardError::InvalidOperation(_)));
    assert_eq!(country.selection().unwrap(), FilterValueSet::EmptyValues);
}

#[test]
fn test_date_filter_rule_and_range_are_exclusive() {
    let dashboard = sales();
    let date = dashboard.date_filter().unwrap();
    assert_eq!(date.id(), "d1");

    let from = chrono::Utc::now() - chrono::Duration::days(7);
    let range = DateRange::new(from, chrono::Utc::now()).unwrap();
    let rule = DateRule::with_count(PeriodRelation::Last, 3, PeriodType::Month);

    date.set_range(Some(range)).unwrap();
    date.set_rule(Some(rule)).unwrap();
    assert_eq!(date.range().unwrap(), None);
    assert_eq!(date.rule().unwrap(), Some(rule));

    date.set_range(Some(range)).unwrap();
    assert_eq!(date.rule().unwrap(), None);
    assert_eq!(date.range().unwrap(), Some(range));
}

#[test]
fn test_date_filter_callback_and_missing_slot() {
    let dashboard = sales();
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    dashboard.set_on_date_filter_changed(Some(Arc::new(move |filter: Option<&DateFilter>| {
        assert!(filter.is_some());
        counter.fetch_add(1, Ordering::SeqCst);
    })));

    assert!(dashboard
        .set_date_filter(FilterValueSet::DateRule(DateRule::new(PeriodRelation::This, PeriodType::Year)))
        .unwrap());
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    // Standard filters do not trigger the date callback
    dashboard
        .filters()
        .get_by_id("f1")
        .unwrap()
        .set_selected_values(vec!["US".into()])
        .unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    let plain = Dashboard::from_model(context(), DashboardModel::new("Plain")).unwrap();
    assert!(plain.date_filter().is_none());
    assert!(!plain.set_date_filter(FilterValueSet::AllValues).unwrap());
    assert!(!plain.has_pending_changes());
}

#[test]
fn test_callbacks_are_replaced_not_accumulated() {
    let dashboard = sales();
    let first = Arc::new(AtomicUsize::new(0));
    let second = Arc::new(AtomicUsize::new(0));

    let counter = first.clone();
    dashboard.set_on_title_changed(Some(Arc::new(move |_: &str| {
        counter.fetch_add(1, Ordering::SeqCst);
    })));
    let counter = second.clone();
    dashboard.set_on_title_changed(Some(Arc::new(move |title: &str| {
        assert_eq!(title, "Sales 2024");
        counter.fetch_add(1, Ordering::SeqCst);
    })));

    dashboard.set_title("Sales 2024").unwrap();
    assert_eq!(first.load(Ordering::SeqCst), 0);
    assert_eq!(second.load(Ordering::SeqCst), 1);

    dashboard.set_on_title_changed(None);
    dashboard.set_title("Sales 2025").unwrap();
    assert_eq!(second.load(Ordering::SeqCst), 1);
}

#[test]
fn test_filters_changed_callback_reads_dashboard() {
    let dashboard = sales();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let recorded = seen.clone();
    dashboard.set_on_filters_changed(Some(Arc::new(move |filters: &[DashboardFilter]| {
        recorded
            .lock()
            .extend(filters.iter().map(|f| f.field_name().unwrap_or_default()));
    })));

    let view = RecordingView::new();
    let attachment = view.attach(&dashboard);
    let added = attachment
        .add_filter(None, FilterModel::new("", "Channel", "channel"))
        .unwrap();

    assert!(!added.id().is_empty());
    assert_eq!(seen.lock().last().map(String::as_str), Some("channel"));

    attachment.remove_filter(added.id()).unwrap();
    assert_eq!(dashboard.filters().len(), 3);
    assert!(matches!(added.field_name(), Err(DashboardError::UnknownFilterIdentity(_))));
}

#[test]
fn test_structural_edits_validate_input() {
    let dashboard = sales();
    let view = RecordingView::new();
    let attachment = view.attach(&dashboard);

    let err = attachment
        .add_filter(None, FilterModel::new("f1", "Country again", "country"))
        .unwrap_err();
    assert_eq!(err, DashboardError::DuplicateIdentity("f1".to_string()));

    let err = attachment.move_visualization(0, 5).unwrap_err();
    assert_eq!(err, DashboardError::IndexOutOfRange { index: 5, len: 2 });

    assert!(matches!(
        attachment.remove_visualization("nope"),
        Err(DashboardError::UnknownVisualization(_))
    ));

    assert!(view.structures.lock().is_empty());
    assert!(!dashboard.has_pending_changes());
}

#[test]
fn test_move_and_update_visualization() {
    let dashboard = sales();
    let view = RecordingView::new();
    let attachment = view.attach(&dashboard);

    attachment.move_visualization(1, 0).unwrap();
    let ids: Vec<String> = dashboard.visualizations().iter().map(|v| v.id().to_string()).collect();
    assert_eq!(ids, vec!["w2", "w1"]);

    let orders = dashboard.visualizations().get_by_id("w2").unwrap();
    orders.set_show_title(false).unwrap();
    assert!(!orders.show_title().unwrap());

    let kinds: Vec<_> = view.structures.lock().iter().map(|c| c.kind.clone()).collect();
    assert_eq!(
        kinds,
        vec![
            StructureChangeKind::VisualizationMoved { from: 1, to: 0 },
            StructureChangeKind::VisualizationUpdated { index: 0 },
        ]
    );
}

#[test]
fn test_detached_attachment_stops_notifications() {
    let dashboard = sales();
    let a = RecordingView::new();
    let b = RecordingView::new();
    let attachment_a = a.attach(&dashboard);
    let attachment_b = b.attach(&dashboard);
    assert_eq!(dashboard.attached_views(), 2);

    attachment_b.detach();
    attachment_b.detach();
    assert_eq!(dashboard.attached_views(), 1);
    assert_eq!(
        attachment_b.update_filter_selection("f1", FilterValueSet::selected(["US"])),
        Err(DashboardError::NotAttached)
    );

    attachment_a
        .update_filter_selection("f1", FilterValueSet::selected(["US"]))
        .unwrap();
    assert!(b.selections.lock().is_empty());

    drop(attachment_a);
    assert_eq!(dashboard.attached_views(), 0);
}

#[test]
fn test_subscribing_again_supersedes_earlier_attachment() {
    let dashboard = sales();
    let a = RecordingView::new();
    let b = RecordingView::new();
    let first = a.attach(&dashboard);
    let second = a.attach(&dashboard);
    let attachment_b = b.attach(&dashboard);

    assert!(!first.is_attached());
    assert_eq!(first.set_title("x"), Err(DashboardError::NotAttached));
    drop(first);

    assert!(second.is_attached());
    assert!(dashboard.is_attached(&a.id));
    assert_eq!(dashboard.attached_views(), 2);

    attachment_b
        .update_filter_selection("f1", FilterValueSet::selected(["US"]))
        .unwrap();
    assert_eq!(a.selections.lock().len(), 1);

    drop(second);
    assert!(!dashboard.is_attached(&a.id));
}

#[test]
fn test_description_edit_notifies_every_view() {
    let dashboard = sales();
    let a = RecordingView::new();
    let b = RecordingView::new();
    let attachment_a = a.attach(&dashboard);
    let _attachment_b = b.attach(&dashboard);

    attachment_a.set_description("Quarterly numbers").unwrap();

    assert!(dashboard.has_pending_changes());
    for view in [&a, &b] {
        let structures = view.structures.lock();
        assert_eq!(structures.len(), 1);
        assert_eq!(structures[0].kind, StructureChangeKind::DescriptionChanged);
        assert_eq!(structures[0].snapshot.description, "Quarterly numbers");
    }
}

#[test]
fn test_handles_fail_after_dashboard_dropped() {
    let dashboard = sales();
    let view = RecordingView::new();
    let attachment = view.attach(&dashboard);
    let country = dashboard.filters().get_by_id("f1").unwrap();

    drop(dashboard);

    assert_eq!(country.selected_values(), Err(DashboardError::Detached));
    assert!(!attachment.is_attached());
    assert_eq!(attachment.set_title("x"), Err(DashboardError::Detached));
}

#[tokio::test]
async fn test_load_and_missing_dashboard() {
    let ctx = context();

    let dashboard = Dashboard::load(&ctx, "sales").await.unwrap();
    assert_eq!(dashboard.dashboard_id().as_deref(), Some("sales"));
    assert_eq!(dashboard.title(), "Sales");

    let err = Dashboard::load(&ctx, "missing").await.unwrap_err();
    assert!(!err.message.is_empty());

    let bare = SdkContext::builder().build();
    assert!(Dashboard::load(&bare, "sales").await.is_err());
}

#[tokio::test]
async fn test_container_round_trip_and_rejects_garbage() {
    let dashboard = sales();
    dashboard.set_description("Quarterly numbers").unwrap();
    let bytes = dashboard.serialize_with_new_name("Sales copy").unwrap();

    let copy = Dashboard::load_from_container(dashboard.context(), bytes).await.unwrap();
    assert_eq!(copy.title(), "Sales copy");
    assert_eq!(copy.description(), "Quarterly numbers");
    assert_eq!(copy.filters().len(), 3);
    assert!(!copy.has_pending_changes());
    // The source document keeps its name
    assert_eq!(dashboard.title(), "Sales");

    let err = Dashboard::load_from_container(dashboard.context(), b"nope".to_vec())
        .await
        .unwrap_err();
    assert!(!err.message.is_empty());
}

#[tokio::test]
async fn test_filter_values_from_value_domain() {
    let dashboard = sales();
    let country = dashboard.filters().get_by_id("f1").unwrap();

    let values = country.filter_values().await.unwrap();
    assert_eq!(values.len(), 3);
    assert_eq!(values[0].label, "US");
    // The domain is independent of the current selection
    assert!(country.selected_values().unwrap().is_empty());

    dashboard.context().update_settings(|s| s.max_filter_values = 2);
    assert_eq!(country.filter_values().await.unwrap().len(), 2);

    let product = dashboard.filters().get_by_id("f2").unwrap();
    assert!(matches!(
        product.filter_values().await,
        Err(DashboardError::ValueDomain(_))
    ));
}

struct CountingSink {
    saves: AtomicUsize,
}

#[async_trait]
impl PersistenceSink for CountingSink {
    async fn save(&self, name: &str, container: Vec<u8>) -> anyhow::Result<SaveReceipt> {
        assert!(!container.is_empty());
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(SaveReceipt {
            dashboard_id: name.to_lowercase(),
        })
    }
}

#[tokio::test]
async fn test_save_clears_pending_changes() {
    let dashboard = sales();
    let sink = Arc::new(CountingSink {
        saves: AtomicUsize::new(0),
    });

    let view = RecordingView::new();
    let _attachment = view.attach(&dashboard);
    dashboard.set_title("Revenue").unwrap();
    assert!(dashboard.has_pending_changes());

    let outcome = dashboard.save(sink.clone(), None).await.unwrap();
    assert_eq!(
        outcome,
        SaveOutcome::Saved(SaveReceipt {
            dashboard_id: "revenue".to_string()
        })
    );
    assert!(!dashboard.has_pending_changes());
    assert_eq!(dashboard.dashboard_id().as_deref(), Some("revenue"));
    assert_eq!(sink.saves.load(Ordering::SeqCst), 1);

    // Views learn the stored id
    let structures = view.structures.lock();
    let last = structures.last().unwrap();
    assert_eq!(last.kind, StructureChangeKind::DashboardIdChanged);
    assert_eq!(last.snapshot.dashboard_id.as_deref(), Some("revenue"));
}

/// Holds every save until released
#[derive(Default)]
struct GatedSink {
    entered: Notify,
    release: Notify,
}

#[async_trait]
impl PersistenceSink for GatedSink {
    async fn save(&self, name: &str, _container: Vec<u8>) -> anyhow::Result<SaveReceipt> {
        self.entered.notify_one();
        self.release.notified().await;
        Ok(SaveReceipt {
            dashboard_id: name.to_lowercase(),
        })
    }
}

#[tokio::test]
async fn test_edit_during_save_stays_pending() {
    let dashboard = sales();
    let view = RecordingView::new();
    let attachment = view.attach(&dashboard);
    let sink = Arc::new(GatedSink::default());

    let saving = tokio::spawn(dashboard.save(sink.clone(), None));
    sink.entered.notified().await;

    attachment
        .update_filter_selection("f2", FilterValueSet::selected(["Bikes"]))
        .unwrap();
    assert!(dashboard.has_pending_changes());

    sink.release.notify_one();
    let outcome = saving.await.unwrap().unwrap();
    assert!(matches!(outcome, SaveOutcome::Saved(_)));

    // The id is adopted, but the edit was not in the saved bytes
    assert_eq!(dashboard.dashboard_id().as_deref(), Some("sales"));
    assert!(dashboard.has_pending_changes());

    let saving = tokio::spawn(dashboard.save(sink.clone(), None));
    sink.entered.notified().await;
    sink.release.notify_one();
    saving.await.unwrap().unwrap();
    assert!(!dashboard.has_pending_changes());
}

#[tokio::test]
async fn test_save_completion_after_drop_is_discarded() {
    let dashboard = sales();
    let sink = Arc::new(CountingSink {
        saves: AtomicUsize::new(0),
    });

    let pending = dashboard.save(sink, Some("Archive".to_string()));
    drop(dashboard);

    let outcome = pending.await.unwrap();
    assert!(matches!(outcome, SaveOutcome::Discarded(_)));
}
