pub mod login_gate;
