pub mod allow_list;

pub use allow_list::{
    create_shared_allow_list, AllowListConfig, AllowListStore, JsonFilePersistence,
    SharedAllowList, ToggleOutcome,
};
