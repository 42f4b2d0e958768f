mod context_menu;
mod controls;
mod details;
mod fps;
mod panels;

pub(super) use fps::FpsCounter;
