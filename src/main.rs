fn main() {
    double_chance_lib::run()
}
