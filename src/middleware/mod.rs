pub mod key_inject;
