mod config;
mod correlator;
mod dialog;
mod origin;
mod protocol;
