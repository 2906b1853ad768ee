pub mod detail_view;
pub mod help_overlay;
pub mod movie_list;
