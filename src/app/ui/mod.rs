mod context_menu;
mod controls;
mod details;
mod panels;
