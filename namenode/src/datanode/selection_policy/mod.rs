pub mod available_space_policy;
pub mod default_selection_policy;
pub mod fallback;
pub mod favored_nodes;
pub mod random_source;
pub mod selection_policy;
