pub mod background;
pub mod cache;
pub mod coordinator;
pub mod evidence;
pub mod export;
pub mod graph;
pub mod import;
pub mod router;
pub mod timeline;

pub use background::BackgroundTasks;
pub use cache::{is_goal_like, SubjectCache, GOAL_VOCABULARY};
pub use coordinator::{Coordinator, CoordinatorConfig};
pub use evidence::{
    build_id_index, extract_keywords, filter_by_dates, filter_by_keywords, render_raw_source,
    select_relevant, Selection, SelectionOptions, SelectionStrategy,
};
pub use export::{write_document, GraphDocument, GraphFormat};
pub use graph::{KnowledgeGraph, CO_OCCURRENCE, DEFAULT_RELATION};
pub use import::{read_document, ImportSummary};
pub use router::{
    classify_query, decision_for, route_by_label, route_by_query, QueryCategory, RoutingDecision,
};
pub use timeline::{
    build_timeline_text, extract_date_tokens, month_number, parse_timestamp, sort_by_time,
    DateToken, TimelineOptions,
};
