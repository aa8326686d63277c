mod helpers;
mod test_evaluate;
mod test_publish;
mod test_targets;
