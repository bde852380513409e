//! Integration tests

mod test_fsm;
#[cfg(unix)]
mod test_provision_script;
mod test_render;
