pub mod process_chime_player;
