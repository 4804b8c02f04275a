mod source_pointers;
mod weight_constraint;
